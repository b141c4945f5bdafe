/// Fill the script prompt template.
///
/// `{DAYS_BACK}` becomes the window size and `{INTERESTS}` a `-` bullet list,
/// each bullet on its own line.
#[must_use]
pub fn render_prompt(template: &str, days_back: u32, interests: &[String]) -> String {
    let bullets = format!("\n-{}", interests.join("\n-"));
    template
        .replace("{DAYS_BACK}", &days_back.to_string())
        .replace("{INTERESTS}", &bullets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_substituted() {
        let template = "Review the last {DAYS_BACK} days. Focus on:{INTERESTS}\nBe fun.";
        let interests = vec!["graph neural networks".to_string(), "RAG".to_string()];

        assert_eq!(
            render_prompt(template, 14, &interests),
            "Review the last 14 days. Focus on:\n-graph neural networks\n-RAG\nBe fun."
        );
    }

    #[test]
    fn test_template_without_placeholders_is_untouched() {
        assert_eq!(render_prompt("plain", 7, &[]), "plain");
    }
}
