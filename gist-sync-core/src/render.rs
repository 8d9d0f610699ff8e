/// Builds the payload stored remotely for one document.
///
/// The layout, closing newline included, is a compatibility contract with
/// entries synced earlier: any change makes every existing entry compare as
/// changed on the next run. `content` appears unmodified just before that
/// closing newline.
pub fn render(title: &str, date: &str, content: &str) -> String {
    format!("# {title}\n\n> Published on {date}\n\n---\n\n{content}\n")
}
