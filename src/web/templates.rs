use askama::Template;

#[derive(Template)]
#[template(path = "index.html", escape = "none")]
pub struct IndexTemplate {
    pub screen_width: u32,
    pub screen_height: u32,
}
