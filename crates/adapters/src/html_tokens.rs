//! Start/end/text token stream over a parsed HTML document

use ego_tree::iter::{Edge, Traverse};
use scraper::node::Element;
use scraper::{Html, Node};

/// One markup token, in document order
#[derive(Debug, Clone, Copy)]
pub(crate) enum Token<'a> {
    Start(&'a Element),
    End(&'a str),
    Text(&'a str),
}

/// Walks the document tree depth-first and yields it as tokens.
///
/// Every element yields a `Start` and a matching `End`, void elements included,
/// so depth tracking over the stream always balances. Comments, doctypes and
/// processing instructions are dropped.
pub(crate) struct Tokens<'a> {
    edges: Traverse<'a, Node>,
}

impl<'a> Tokens<'a> {
    pub(crate) fn new(document: &'a Html) -> Self {
        Self {
            edges: document.tree.root().traverse(),
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            let token = match self.edges.next()? {
                Edge::Open(node) => match node.value() {
                    Node::Element(element) => Token::Start(element),
                    Node::Text(text) => Token::Text(&**text),
                    _ => continue,
                },
                Edge::Close(node) => match node.value() {
                    Node::Element(element) => Token::End(element.name()),
                    _ => continue,
                },
            };
            return Some(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(html: &str) -> Vec<String> {
        let document = Html::parse_fragment(html);
        Tokens::new(&document)
            .map(|token| match token {
                Token::Start(el) => format!("<{}>", el.name()),
                Token::End(name) => format!("</{}>", name),
                Token::Text(text) => format!("{:?}", text),
            })
            .collect()
    }

    #[test]
    fn test_tokens_follow_document_order() {
        let tokens = describe(r#"<div class="a"><span>hi</span><br>there</div>"#);
        let body: Vec<_> = tokens
            .iter()
            .skip_while(|t| *t != "<div>")
            .take_while(|t| *t != "</div>")
            .cloned()
            .collect();

        assert_eq!(
            body,
            vec!["<div>", "<span>", "\"hi\"", "</span>", "<br>", "</br>", "\"there\""]
        );
    }

    #[test]
    fn test_comments_are_dropped() {
        let tokens = describe("<p><!-- note -->text</p>");
        assert!(tokens.iter().all(|t| !t.contains("note")));
        assert!(tokens.contains(&"\"text\"".to_string()));
    }
}
