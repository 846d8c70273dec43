//! XML payload decoding.

use std::str::FromStr;

use roxmltree::Node;

use super::value;
use super::{
    Breakpoint, BreakpointType, EngineError, Message, MessageType, Properties, StackFrame, State,
    Variable,
};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown message: {0}")]
    UnknownMessage(String),

    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("expected <{expected}> root element, found <{found}>")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("invalid {name}={value:?} on <{element}>")]
    InvalidAttribute {
        element: String,
        name: &'static str,
        value: String,
    },
}

/// Decode a raw frame payload.
///
/// Payloads are UTF-8 in practice even when the declaration says
/// `iso-8859-1`; anything that is not valid UTF-8 is read as Latin-1.
pub fn decode_bytes(payload: &[u8]) -> Result<Message, DecodeError> {
    match std::str::from_utf8(payload) {
        Ok(xml) => decode(xml),
        Err(_) => {
            let xml: String = payload.iter().map(|&b| char::from(b)).collect();
            decode(&xml)
        }
    }
}

/// Decode an engine XML message.
///
/// The shape is picked by the closing tag; the engine never mixes the two.
pub fn decode(xml: &str) -> Result<Message, DecodeError> {
    if xml.contains("</response>") {
        decode_response(xml)
    } else if xml.contains("</init>") {
        decode_init(xml)
    } else {
        Err(DecodeError::UnknownMessage(xml.to_string()))
    }
}

fn decode_init(xml: &str) -> Result<Message, DecodeError> {
    let document = roxmltree::Document::parse(strip_declaration(xml))?;
    let root = expect_root(&document, "init")?;

    Ok(Message {
        message_type: MessageType::Init,
        state: State::Starting,
        properties: Properties {
            filename: root.attribute("fileuri").unwrap_or_default().to_string(),
            ..Default::default()
        },
        ..Default::default()
    })
}

fn decode_response(xml: &str) -> Result<Message, DecodeError> {
    let document = roxmltree::Document::parse(strip_declaration(xml))?;
    let root = expect_root(&document, "response")?;

    let (content, content_is_base64) =
        value::extract(&direct_text(root), root.attribute("encoding"));
    let mut message = Message {
        message_type: MessageType::Response,
        state: State::from_status(root.attribute("status").unwrap_or_default()),
        properties: Properties {
            command: root.attribute("command").unwrap_or_default().to_string(),
            transaction_id: parse_attr(root, "transaction_id")?,
            breakpoint_id: parse_attr(root, "id")?,
            ..Default::default()
        },
        content,
        content_is_base64,
        ..Default::default()
    };
    let global_context = root.attribute("context") == Some("1");

    for child in root.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "message" => {
                message.properties.filename =
                    child.attribute("filename").unwrap_or_default().to_string();
                message.properties.line_number = parse_attr(child, "lineno")?;
            }
            "error" => {
                message.properties.error = Some(EngineError {
                    code: parse_attr(child, "code")?.unwrap_or_default(),
                    message: child_text(child, "message").unwrap_or_default(),
                });
            }
            "breakpoint" => {
                if let Some(breakpoint) = decode_breakpoint(child)? {
                    message.breakpoints.insert(breakpoint.id, breakpoint);
                }
            }
            "property" => {
                let variable = decode_property(child)?;
                if global_context {
                    message.context.global.push(variable);
                } else {
                    message.context.local.push(variable);
                }
            }
            "stack" => message.stack_frames.push(decode_stack_frame(child)?),
            other => tracing::trace!(element = other, "ignoring response element"),
        }
    }

    Ok(message)
}

fn decode_breakpoint(node: Node) -> Result<Option<Breakpoint>, DecodeError> {
    let Some(id) = parse_attr(node, "id")? else {
        tracing::debug!("breakpoint without id");
        return Ok(None);
    };
    let kind_attr = node.attribute("type").unwrap_or("line");
    let Some(kind) = BreakpointType::from_attr(kind_attr) else {
        tracing::debug!(kind = kind_attr, id, "skipping breakpoint of unknown type");
        return Ok(None);
    };

    Ok(Some(Breakpoint {
        id,
        kind,
        enabled: node.attribute("state").is_none_or(|state| state == "enabled"),
        filename: node.attribute("filename").unwrap_or_default().to_string(),
        line_number: parse_attr(node, "lineno")?.unwrap_or_default(),
    }))
}

fn decode_stack_frame(node: Node) -> Result<StackFrame, DecodeError> {
    Ok(StackFrame {
        level: parse_attr(node, "level")?.unwrap_or_default(),
        function: node.attribute("where").unwrap_or_default().to_string(),
        kind: node.attribute("type").unwrap_or_default().to_string(),
        filename: node.attribute("filename").unwrap_or_default().to_string(),
        line_number: parse_attr(node, "lineno")?.unwrap_or_default(),
    })
}

/// Recursively decode a `<property>` element. Leaves simply have no
/// nested `<property>` children.
fn decode_property(node: Node) -> Result<Variable, DecodeError> {
    let children = node
        .children()
        .filter(|child| child.is_element() && child.tag_name().name() == "property")
        .map(decode_property)
        .collect::<Result<Vec<_>, _>>()?;

    let has_children = node.attribute("children") == Some("1");
    let (value, is_base64) = match element_child(node, "value") {
        Some(value_node) => value::extract(&direct_text(value_node), value_node.attribute("encoding")),
        None => value::extract(&direct_text(node), node.attribute("encoding")),
    };

    Ok(Variable {
        name: attr_or_child(node, "name"),
        full_name: attr_or_child(node, "fullname"),
        var_type: node.attribute("type").unwrap_or_default().to_string(),
        value,
        facet: node.attribute("facet").unwrap_or_default().to_string(),
        has_children,
        num_children: parse_attr(node, "numchildren")?.unwrap_or_default(),
        children_loaded: has_children && !children.is_empty(),
        is_base64,
        children,
    })
}

fn expect_root<'a, 'input>(
    document: &'a roxmltree::Document<'input>,
    expected: &'static str,
) -> Result<Node<'a, 'input>, DecodeError> {
    let root = document.root_element();
    let found = root.tag_name().name();
    if found != expected {
        return Err(DecodeError::UnexpectedRoot {
            expected,
            found: found.to_string(),
        });
    }
    Ok(root)
}

fn parse_attr<T: FromStr>(node: Node, name: &'static str) -> Result<Option<T>, DecodeError> {
    match node.attribute(name) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DecodeError::InvalidAttribute {
                element: node.tag_name().name().to_string(),
                name,
                value: raw.to_string(),
            }),
    }
}

fn element_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
}

fn child_text(node: Node, name: &str) -> Option<String> {
    element_child(node, name).map(direct_text)
}

/// Attribute value, falling back to a child element of the same name as
/// sent by engines with extended properties enabled.
fn attr_or_child(node: Node, name: &str) -> String {
    if let Some(value) = node.attribute(name) {
        return value.to_string();
    }
    element_child(node, name)
        .map(|child| value::extract(&direct_text(child), child.attribute("encoding")).0)
        .unwrap_or_default()
}

/// Text and CDATA directly under `node`. Whitespace that only separates
/// child elements yields an empty string.
fn direct_text(node: Node) -> String {
    let text: String = node
        .children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect();
    if text.trim().is_empty() {
        String::new()
    } else {
        text
    }
}

fn strip_declaration(xml: &str) -> &str {
    let trimmed = xml.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return &trimmed[end + 2..];
        }
    }
    trimmed
}
