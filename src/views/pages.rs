use crate::models::student::{Cohort, Student};
use crate::security::flash::Flash;
use crate::utils::html::escape;
use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem}\
.flash{padding:.75rem 1rem;border-radius:4px;margin-bottom:1rem}\
.flash.success{background:#d1e7dd;color:#0f5132}\
.flash.danger{background:#f8d7da;color:#842029}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #ccc;padding:.4rem .6rem;text-align:left}\
label{display:block;margin-top:.75rem}";

fn layout(title: &str, flash: Option<&Flash>, body: &str) -> String {
    let flash_html = flash
        .map(|f| {
            format!(
                r#"<div class="flash {}">{}</div>"#,
                f.level.as_str(),
                escape(&f.message)
            )
        })
        .unwrap_or_default();

    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{flash_html}\n{body}\n</body>\n</html>\n",
        title = escape(title),
    )
}

/// Public registration form
pub fn render_index(flash: Option<&Flash>) -> String {
    let mut options = String::new();
    for cohort in Cohort::ALL {
        let _ = write!(options, r#"<option value="{0}">{0}</option>"#, cohort);
    }

    let body = format!(
        r#"<h1>Akathon Registration</h1>
<form method="post" action="/register">
<label>Username <input name="username" placeholder="PLASU/YEAR/FNAS/MAT" required></label>
<label>Password <input name="password" type="password" placeholder="AKTH/YEAR/CCC/MAT" required></label>
<label>Cohort <select name="cohort" required><option value="">Choose a cohort</option>{options}</select></label>
<p><button type="submit">Register</button></p>
</form>"#
    );

    layout("Akathon Registration", flash, &body)
}

/// Admin registrant list. `key_query` is the already url-encoded `key=...`
/// pair appended to every admin link.
pub fn render_admin(
    students: &[Student],
    max_per_cohort: u32,
    key_query: &str,
    flash: Option<&Flash>,
) -> String {
    let key_query = escape(key_query);
    let mut body = String::from("<h1>Akathon Registrants</h1>\n<p>");

    for cohort in Cohort::ALL {
        let count = students.iter().filter(|s| s.cohort == cohort.year()).count();
        let _ = write!(body, "Cohort {}: {} / {}<br>", cohort, count, max_per_cohort);
    }

    let _ = write!(
        body,
        "Total: {}</p>\n<p><a href=\"/export?{}\">Export to Excel</a></p>\n",
        students.len(),
        key_query
    );

    if students.is_empty() {
        body.push_str("<p>No registrations yet.</p>");
        return layout("Akathon Admin", flash, &body);
    }

    body.push_str(
        "<table>\n<thead><tr><th>ID</th><th>Username</th><th>Cohort</th><th>MAT</th>\
<th>Registered (UTC)</th><th></th></tr></thead>\n<tbody>\n",
    );

    for student in students {
        let _ = write!(
            body,
            "<tr><td>{id}</td><td>{username}</td><td>{cohort}</td><td>{mat}</td><td>{created}</td>\
<td><a href=\"/delete/{id}?{key_query}\">Delete</a></td></tr>\n",
            id = student.id,
            username = escape(&student.username),
            cohort = student.cohort,
            mat = escape(&student.mat),
            created = escape(&student.created_at),
        );
    }

    body.push_str("</tbody>\n</table>");

    layout("Akathon Admin", flash, &body)
}
