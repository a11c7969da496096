//! Built-in prompt templates
//!
//! A template pairs a short title, which is what the transcript shows and
//! what names the workspace, with the detailed prompt actually sent.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromptTemplate {
    pub id: &'static str,
    pub title: &'static str,
    #[serde(skip)]
    pub prompt: &'static str,
}

pub const TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        id: "ad-copy",
        title: "Create persuasive ad copy for my startup",
        prompt: "Write three variations of persuasive ad copy for my startup. \
            For each variation give a headline of at most eight words, a two-sentence body \
            and a call to action. Use **bold** for the headline and list the variations as bullet points.",
    },
    PromptTemplate {
        id: "social-post",
        title: "Draft a social media launch post",
        prompt: "Draft a short social media post announcing our product launch. \
            Keep it under 280 characters, include one emoji at most and end with a question \
            that invites replies. Offer two alternatives as bullet points.",
    },
    PromptTemplate {
        id: "email-campaign",
        title: "Outline an email campaign",
        prompt: "Outline a four-email nurture campaign for new sign-ups. For each email give \
            the subject line in **bold**, the goal of the email and three bullet points \
            describing its content.",
    },
    PromptTemplate {
        id: "product-description",
        title: "Write a product description",
        prompt: "Write a product description of about 120 words that highlights the main \
            benefit first, then lists three key features as bullet points and closes with a \
            one-sentence guarantee.",
    },
];

pub fn find(id: &str) -> Option<&'static PromptTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}
