/// Joins recognized texts into one transcript.
///
/// Each text is trimmed and becomes one block, empty blocks included, so a
/// blank unit still occupies its place between its neighbours. Blocks are
/// separated by exactly one blank line, in input order, and the result is
/// trimmed.
pub fn aggregate<I, S>(texts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut transcript = String::new();

    for (i, text) in texts.into_iter().enumerate() {
        if i > 0 {
            transcript.push_str("\n\n");
        }
        transcript.push_str(text.as_ref().trim());
    }

    transcript.trim().to_string()
}
