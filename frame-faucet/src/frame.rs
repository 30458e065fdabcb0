//! Frame Document Rendering
//!
//! Builds the HTML documents Farcaster clients read frame metadata from:
//! the initial claim page and one reply document per claim request.

use std::fmt::Write as _;

use lib_faucet::{ClaimReply, FaucetPolicy, FrameImage};

pub const FRAME_TITLE: &str = "Helios Faucet";

/// Single frame button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameButton {
    /// Posts back to the frame's post URL.
    Post { label: String },
    /// Opens an external URL.
    Link { label: String, target: String },
}

/// One frame document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHtml {
    pub image_url: String,
    pub post_url: String,
    pub button: FrameButton,
    pub title: Option<String>,
    pub body: FrameBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameBody {
    /// Status line shown to browsers.
    Message(String),
    /// Landing content for browsers that open the frame URL directly.
    Landing,
}

impl FrameHtml {
    pub fn render(&self) -> String {
        let mut html = String::with_capacity(1024);
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("<meta charset=\"utf-8\" />\n");
        if let Some(title) = &self.title {
            let _ = writeln!(html, "<title>{}</title>", escape_html(title));
        }
        meta(&mut html, "fc:frame", "vNext");
        meta(&mut html, "fc:frame:image", &self.image_url);
        meta(&mut html, "og:image", &self.image_url);
        meta(&mut html, "fc:frame:post_url", &self.post_url);
        match &self.button {
            FrameButton::Post { label } => {
                meta(&mut html, "fc:frame:button:1", label);
            }
            FrameButton::Link { label, target } => {
                meta(&mut html, "fc:frame:button:1", label);
                meta(&mut html, "fc:frame:button:1:action", "link");
                meta(&mut html, "fc:frame:button:1:target", target);
            }
        }
        html.push_str("</head>\n<body>\n");
        match &self.body {
            FrameBody::Message(message) => {
                let _ = writeln!(html, "<p>{}</p>", escape_html(message));
            }
            FrameBody::Landing => {
                let _ = writeln!(html, "<h1>{} Frame</h1>", escape_html(FRAME_TITLE));
                html.push_str(
                    "<p>This page is a Farcaster frame. View it in a Farcaster client to use the faucet.</p>\n",
                );
            }
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

fn meta(html: &mut String, property: &str, content: &str) {
    let _ = writeln!(
        html,
        "<meta property=\"{}\" content=\"{}\" />",
        escape_html(property),
        escape_html(content)
    );
}

/// Escape text for HTML element content and double-quoted attributes.
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

/// Turns claim replies into frame documents for one deployment.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    base_url: String,
    explorer_tx_url: String,
    claim_label: String,
}

impl FrameRenderer {
    pub fn new(base_url: &str, explorer_tx_url: &str, policy: &FaucetPolicy) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            explorer_tx_url: explorer_tx_url.to_string(),
            claim_label: format!("Claim {} {}", policy.display_amount(), policy.token_symbol),
        }
    }

    pub fn image_url(&self, image: FrameImage) -> String {
        format!("{}/images/{}", self.base_url, image.file_name())
    }

    pub fn post_url(&self) -> String {
        format!("{}/api/claim", self.base_url)
    }

    /// Landing frame with the claim button.
    pub fn initial(&self) -> FrameHtml {
        FrameHtml {
            image_url: self.image_url(FrameImage::Initial),
            post_url: self.post_url(),
            button: FrameButton::Post {
                label: self.claim_label.clone(),
            },
            title: Some(FRAME_TITLE.to_string()),
            body: FrameBody::Landing,
        }
    }

    /// Reply frame; links to the explorer whenever funds moved.
    pub fn reply(&self, reply: &ClaimReply) -> FrameHtml {
        let button = match reply.transaction {
            Some(tx_hash) => FrameButton::Link {
                label: "View Transaction".to_string(),
                target: format!("{}{}", self.explorer_tx_url, tx_hash),
            },
            None => FrameButton::Post {
                label: "Try Again".to_string(),
            },
        };

        FrameHtml {
            image_url: self.image_url(reply.image),
            post_url: self.post_url(),
            button,
            title: None,
            body: FrameBody::Message(reply.message.clone()),
        }
    }
}
