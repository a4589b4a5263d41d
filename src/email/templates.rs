use crate::types::{UserRole, UserStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum EmailTemplate {
    Welcome { name: String },
    StatusChanged { name: String, status: UserStatus },
    RoleChanged { name: String, role: UserRole },
    Notification { title: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

impl EmailTemplate {
    pub fn render(&self) -> RenderedEmail {
        match self {
            EmailTemplate::Welcome { name } => RenderedEmail {
                subject: "Welcome to UserHub".to_string(),
                html: layout(&format!(
                    "<p>Hi {},</p><p>Your account is ready. You can sign in at any time.</p>",
                    escape_html(name)
                )),
            },
            EmailTemplate::StatusChanged { name, status } => RenderedEmail {
                subject: format!("Your account is now {}", status),
                html: layout(&format!(
                    "<p>Hi {},</p><p>An administrator changed your account status to <strong>{}</strong>.</p>",
                    escape_html(name),
                    status
                )),
            },
            EmailTemplate::RoleChanged { name, role } => RenderedEmail {
                subject: format!("Your role is now {}", role),
                html: layout(&format!(
                    "<p>Hi {},</p><p>Your role was changed to <strong>{}</strong>.</p>",
                    escape_html(name),
                    role
                )),
            },
            EmailTemplate::Notification { title, message } => RenderedEmail {
                subject: title.clone(),
                html: layout(&format!(
                    "<h2>{}</h2><p>{}</p>",
                    escape_html(title),
                    escape_html(message)
                )),
            },
        }
    }
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body style=\"font-family: sans-serif\">{}<hr><p style=\"color:#888\">UserHub</p></body></html>",
        body
    )
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_user_supplied_names() {
        let rendered = EmailTemplate::Welcome {
            name: "<script>alert('x')</script>".to_string(),
        }
        .render();
        assert!(!rendered.html.contains("<script>"));
        assert!(rendered.html.contains("&lt;script&gt;alert(&#39;x&#39;)"));
    }

    #[test]
    fn status_subject_names_the_status() {
        let rendered = EmailTemplate::StatusChanged {
            name: "Ada".to_string(),
            status: UserStatus::Suspended,
        }
        .render();
        assert_eq!(rendered.subject, "Your account is now suspended");
    }
}
