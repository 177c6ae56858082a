use std::fmt::Write;

use indexmap::IndexMap;

#[derive(Debug)]
pub enum HtmlNode {
    Element(HtmlElement),
    Text(String),
}

impl From<HtmlElement> for HtmlNode {
    fn from(value: HtmlElement) -> Self {
        Self::Element(value)
    }
}

#[derive(Debug)]
pub struct HtmlElement {
    pub tag_name: String,
    pub children: Vec<HtmlNode>,
    pub attrs: IndexMap<String, String>,
}

impl HtmlElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag_name: tag.into(),
            children: Vec::new(),
            attrs: IndexMap::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Removes an attribute, keeping the order of the remaining ones.
    pub fn remove_attr(mut self, name: &str) -> Self {
        self.attrs.shift_remove(name);
        self
    }

    pub fn child(mut self, child: impl Into<HtmlNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<C>(mut self, children: impl IntoIterator<Item = C>) -> Self
    where
        C: Into<HtmlNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Appends escaped text content.
    pub fn text(mut self, text: impl AsRef<str>) -> Self {
        self.children.push(HtmlNode::Text(text.as_ref().to_string()));
        self
    }

    pub fn render_to_string(&self) -> Result<String, std::fmt::Error> {
        let mut html = String::new();
        self.render_into(&mut html)?;
        Ok(html)
    }

    fn render_into(&self, html: &mut String) -> std::fmt::Result {
        write!(html, "<{}", self.tag_name)?;

        for (name, value) in &self.attrs {
            write!(
                html,
                r#" {name}="{}""#,
                html_escape::encode_double_quoted_attribute(value)
            )?;
        }

        write!(html, ">")?;

        if is_void(&self.tag_name) {
            return Ok(());
        }

        for child in &self.children {
            match child {
                HtmlNode::Element(element) => element.render_into(html)?,
                HtmlNode::Text(text) => write!(html, "{}", html_escape::encode_text(text))?,
            }
        }

        write!(html, "</{}>", self.tag_name)
    }
}

fn is_void(tag_name: &str) -> bool {
    matches!(tag_name, "meta" | "link" | "br" | "hr" | "img")
}

impl HtmlElement {
    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn href(self, href: impl Into<String>) -> Self {
        self.attr("href", href)
    }

    pub fn lang(self, lang: impl Into<String>) -> Self {
        self.attr("lang", lang)
    }
}

macro_rules! elements {
    ($($name:ident),*) => {
        $(
            pub fn $name() -> HtmlElement {
                HtmlElement::new(stringify!($name))
            }
        )*
    };
}

elements!(a, article, body, div, h1, h2, head, html, li, meta, nav, p, section, span, time, title, ul);
