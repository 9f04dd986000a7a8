//! A minimal generic XML DOM, just enough to walk the `<NODE>`/`<EVENT>`
//! grammar in SPEC_FULL.md §6. Parsing is iterative (an explicit stack of
//! in-progress elements) rather than recursive, matching `quick_xml`'s own
//! streaming model.

use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;

#[derive(Clone, Debug, Default)]
pub struct XmlNode {
    pub tag: String,
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

pub fn parse_xml_fragment(body: &str) -> Result<XmlNode, quick_xml::Error> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut stack = vec![XmlNode {
        tag: "#root".to_string(),
        text: None,
        children: Vec::new(),
    }];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(XmlNode {
                    tag,
                    text: None,
                    children: Vec::new(),
                });
            }
            XmlEvent::Empty(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.last_mut().unwrap().children.push(XmlNode {
                    tag,
                    text: None,
                    children: Vec::new(),
                });
            }
            XmlEvent::End(_) => {
                let finished = stack.pop().expect("unbalanced XML end tag");
                stack.last_mut().unwrap().children.push(finished);
            }
            XmlEvent::Text(text) => {
                let decoded = text.unescape()?.into_owned();
                if let Some(top) = stack.last_mut() {
                    top.text = Some(decoded);
                }
            }
            XmlEvent::CData(cdata) => {
                let decoded = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                if let Some(top) = stack.last_mut() {
                    top.text = Some(decoded);
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(stack.pop().expect("root frame always present"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_text() {
        let dom = parse_xml_fragment("<ROOT><A>hi</A><B><C/></B></ROOT>").unwrap();
        assert_eq!(dom.children.len(), 1);
        let root = &dom.children[0];
        assert_eq!(root.tag, "ROOT");
        assert_eq!(root.children[0].tag, "A");
        assert_eq!(root.children[0].text.as_deref(), Some("hi"));
        assert_eq!(root.children[1].children[0].tag, "C");
    }

    #[test]
    fn multiple_top_level_trees() {
        let dom = parse_xml_fragment("<ROOT><NODE/><NODE/></ROOT>").unwrap();
        let root = &dom.children[0];
        assert_eq!(root.children.len(), 2);
    }
}
