//! array/zapi - NetApp ZAPI envelope: XML request building and reply parsing.
//!
//! Запрос:
//!   <?xml version="1.0" encoding="UTF-8"?>
//!   <netapp version="1.7" xmlns="http://www.netapp.com/filer/admin" [vfiler="svm"]>
//!     <api-name>...</api-name>
//!   </netapp>
//!
//! Ответ:
//!   <netapp ...><results status="passed|failed" [reason=".." errno=".."]>...</results></netapp>
//!
//! Разбор ответа - через xmlparser (pull tokenizer) в маленькое дерево `ZapiElement`.

use anyhow::{anyhow, Result};
use xmlparser::{ElementEnd, Token, Tokenizer};

pub const ZAPI_XMLNS: &str = "http://www.netapp.com/filer/admin";

/// XML element of a ZAPI request or reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZapiElement {
    name: String,
    attrs: Vec<(String, String)>,
    content: String,
    children: Vec<ZapiElement>,
}

impl ZapiElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_child(mut self, child: ZapiElement) -> Self {
        self.children.push(child);
        self
    }

    /// Adds `<name>value</name>`.
    pub fn with_text_child(self, name: &str, value: &str) -> Self {
        let mut child = ZapiElement::new(name);
        child.content = value.to_string();
        self.with_child(child)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[ZapiElement] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&ZapiElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the first child called `name`, trimmed; None if absent or empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.content.trim())
            .filter(|s| !s.is_empty())
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push_str(&format!(" {}=\"{}\"", k, escape(v)));
        }
        if self.children.is_empty() && self.content.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        out.push_str(&escape(&self.content));
        for c in &self.children {
            c.write_xml(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }
}

/// Full request document for one API call.
pub fn envelope(api: &ZapiElement, major: u32, minor: u32, vfiler: Option<&str>) -> String {
    let mut root = ZapiElement::new("netapp");
    root.attrs
        .push(("version".to_string(), format!("{}.{}", major, minor)));
    root.attrs
        .push(("xmlns".to_string(), ZAPI_XMLNS.to_string()));
    if let Some(v) = vfiler.filter(|v| !v.is_empty()) {
        root.attrs.push(("vfiler".to_string(), v.to_string()));
    }
    root.children.push(api.clone());

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<!DOCTYPE netapp SYSTEM \"file:/etc/netapp_filer.dtd\">\n");
    root.write_xml(&mut out);
    out
}

/// `<results>` part of a reply.
#[derive(Debug, Clone)]
pub struct ZapiReply {
    results: ZapiElement,
}

impl ZapiReply {
    pub fn passed(&self) -> bool {
        self.results.attr("status") == Some("passed")
    }

    pub fn reason(&self) -> &str {
        self.results.attr("reason").unwrap_or("")
    }

    pub fn errno(&self) -> Option<u32> {
        self.results.attr("errno").and_then(|e| e.trim().parse().ok())
    }

    pub fn results(&self) -> &ZapiElement {
        &self.results
    }
}

/// Parse a reply document and extract `<results>`.
pub fn parse_reply(text: &str) -> Result<ZapiReply> {
    let root = parse_document(text)?;
    if root.name != "netapp" {
        return Err(anyhow!("unexpected zapi root element <{}>", root.name));
    }
    let results = root
        .child("results")
        .cloned()
        .ok_or_else(|| anyhow!("zapi reply without <results>"))?;
    Ok(ZapiReply { results })
}

/// Parse an XML document into its root element (namespaces prefixes dropped).
pub fn parse_document(text: &str) -> Result<ZapiElement> {
    let mut stack: Vec<ZapiElement> = Vec::new();
    let mut root: Option<ZapiElement> = None;

    for token in Tokenizer::from(text) {
        let token = token.map_err(|e| anyhow!("zapi xml: {}", e))?;
        match token {
            Token::ElementStart { local, .. } => {
                stack.push(ZapiElement::new(local.as_str()));
            }
            Token::Attribute { local, value, .. } => {
                if let Some(top) = stack.last_mut() {
                    top.attrs
                        .push((local.as_str().to_string(), unescape(value.as_str())));
                }
            }
            Token::ElementEnd { end, .. } => match end {
                ElementEnd::Open => {}
                ElementEnd::Close(..) | ElementEnd::Empty => {
                    let done = stack
                        .pop()
                        .ok_or_else(|| anyhow!("zapi xml: unbalanced close tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(done),
                        None => root = Some(done),
                    }
                }
            },
            Token::Text { text } => {
                if let Some(top) = stack.last_mut() {
                    top.content.push_str(&unescape(text.as_str()));
                }
            }
            Token::Cdata { text, .. } => {
                if let Some(top) = stack.last_mut() {
                    top.content.push_str(text.as_str());
                }
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(anyhow!("zapi xml: unterminated element <{}>", stack[stack.len() - 1].name));
    }
    root.ok_or_else(|| anyhow!("zapi xml: empty document"))
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        let tail = &rest[i..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|h| u32::from_str_radix(h, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_lun_query_envelope() {
        let api = ZapiElement::new("lun-get-iter").with_child(
            ZapiElement::new("query").with_child(
                ZapiElement::new("lun-info").with_text_child("serial-number", "LUN<42>"),
            ),
        );
        let xml = envelope(&api, 1, 7, Some("svm1"));
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<netapp version=\"1.7\" xmlns=\"http://www.netapp.com/filer/admin\" vfiler=\"svm1\">"));
        assert!(xml.contains(
            "<lun-get-iter><query><lun-info><serial-number>LUN&lt;42&gt;</serial-number></lun-info></query></lun-get-iter>"
        ));
    }

    #[test]
    fn parses_passed_reply() -> Result<()> {
        let xml = r#"<?xml version='1.0' encoding='UTF-8' ?>
<!DOCTYPE netapp SYSTEM 'file:/etc/netapp_filer.dtd'>
<netapp version='1.7' xmlns='http://www.netapp.com/filer/admin'>
  <results status="passed">
    <attributes-list>
      <lun-info><path>/vol/vol1/lun0</path><serial-number>LUN42</serial-number></lun-info>
    </attributes-list>
    <num-records>1</num-records>
  </results>
</netapp>"#;
        let r = parse_reply(xml)?;
        assert!(r.passed());
        let info = r
            .results()
            .child("attributes-list")
            .and_then(|a| a.child("lun-info"))
            .expect("lun-info");
        assert_eq!(info.child_text("path"), Some("/vol/vol1/lun0"));
        assert_eq!(info.child_text("serial-number"), Some("LUN42"));
        Ok(())
    }

    #[test]
    fn parses_failed_reply() -> Result<()> {
        let xml = r#"<netapp version="1.7"><results status="failed" errno="13020" reason="Snapshot copy name already exists &amp; more"/></netapp>"#;
        let r = parse_reply(xml)?;
        assert!(!r.passed());
        assert_eq!(r.errno(), Some(13020));
        assert_eq!(r.reason(), "Snapshot copy name already exists & more");
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_reply("<html><body>nope</body></html>").is_err());
        assert!(parse_reply("<netapp><results status='passed'>").is_err());
        assert!(parse_reply("").is_err());
    }

    #[test]
    fn unescape_entities() {
        assert_eq!(unescape("a &lt;b&gt; &#65;&#x42; &bogus; &"), "a <b> AB &bogus; &");
    }
}
