//! Placeholder substitution for message templates.
//!
//! Recognized tokens: `{customerName}`, `{technicianName}`, `{googleReviewLink}`, `{cityName}`.
//! Anything else between braces is copied through untouched. The output is sent verbatim,
//! so no escaping happens here.

/// Values available to a template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub customer_name: &'a str,
    pub technician_name: &'a str,
    pub review_link: &'a str,
    pub city_name: &'a str,
}

impl<'a> TemplateValues<'a> {
    fn lookup(&self, token: &str) -> Option<&'a str> {
        match token {
            "customerName" => Some(self.customer_name),
            "technicianName" => Some(self.technician_name),
            "googleReviewLink" => Some(self.review_link),
            "cityName" => Some(self.city_name),
            _ => None,
        }
    }
}

/// Renders `template` in a single left-to-right pass.
///
/// Substituted values are never re-scanned: a customer named `{technicianName}` stays literal.
pub fn render_template(template: &str, values: &TemplateValues<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        match after_open.find('}') {
            Some(close) => {
                let token = &after_open[..close];
                match values.lookup(token) {
                    Some(value) => out.push_str(value),
                    None => {
                        // Unknown token: keep the brace and continue scanning right after it,
                        // so `{{customerName}` still substitutes the inner token.
                        out.push('{');
                        rest = after_open;
                        continue;
                    }
                }
                rest = &after_open[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
