//! HTML fixtures shaped like the source site's pages, for unit and
//! integration tests.

/// Login form without an anti-forgery token.
pub fn login_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>Logga in</title></head>
<body>
  <form method="post" action="/login">
    <input type="text" name="username">
    <input type="password" name="password">
    <button type="submit">Logga in</button>
  </form>
</body>
</html>"#
        .to_string()
}

/// Login form carrying `token` in a hidden `_token` input.
pub fn login_page_with_token(token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Logga in</title></head>
<body>
  <form method="post" action="/login">
    <input type="hidden" name="_token" value="{token}">
    <input type="text" name="username">
    <input type="password" name="password">
    <button type="submit">Logga in</button>
  </form>
</body>
</html>"#
    )
}

/// Page a logged-out visitor gets instead of members content.
pub fn session_expired_page() -> String {
    "<html><body><p>Du måste logga in för att se denna sida.</p></body></html>".to_string()
}

/// Club landing page with one anchor per `(href, text)` pair.
pub fn teams_page(links: &[(&str, &str)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(href, text)| format!("      <li><a href=\"{href}\">{text}</a></li>\n"))
        .collect();
    format!(
        "<html><body>\n  <nav>\n    <ul>\n{anchors}    </ul>\n  </nav>\n</body></html>"
    )
}

/// One row of a roster table.
#[derive(Debug, Clone)]
pub struct PlayerRow {
    pub href: String,
    pub name: String,
    pub position: String,
    pub jersey: String,
}

impl PlayerRow {
    pub fn new(href: &str, name: &str, position: &str, jersey: &str) -> Self {
        PlayerRow {
            href: href.to_string(),
            name: name.to_string(),
            position: position.to_string(),
            jersey: jersey.to_string(),
        }
    }
}

/// Roster table with one `tr.player` per row.
pub fn players_page(rows: &[PlayerRow]) -> String {
    let body: String = rows
        .iter()
        .map(|row| {
            format!(
                "    <tr class=\"player\"><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>\n",
                row.href, row.name, row.position, row.jersey
            )
        })
        .collect();
    format!(
        "<html><body>\n  <table class=\"roster\">\n{body}  </table>\n</body></html>"
    )
}

/// One row of the matches table.
#[derive(Debug, Clone)]
pub struct EventRow {
    pub href: String,
    pub title: String,
    pub date: String,
    pub location: String,
}

impl EventRow {
    pub fn new(href: &str, title: &str, date: &str, location: &str) -> Self {
        EventRow {
            href: href.to_string(),
            title: title.to_string(),
            date: date.to_string(),
            location: location.to_string(),
        }
    }
}

/// Matches table with one `tr.event` per row.
pub fn events_page(rows: &[EventRow]) -> String {
    let body: String = rows
        .iter()
        .map(|row| {
            format!(
                "    <tr class=\"event\"><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>\n",
                row.href, row.title, row.date, row.location
            )
        })
        .collect();
    format!(
        "<html><body>\n  <table class=\"matches\">\n{body}  </table>\n</body></html>"
    )
}
