use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Raw encoded image bytes (PNG or JPEG) plus the size it should occupy on the page.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageAsset {
    pub data: Vec<u8>,
    pub display_width: f32,  // points
    pub display_height: f32, // points
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogoPair {
    pub left: ImageAsset,
    pub right: ImageAsset,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BrandingAssets {
    #[serde(default)]
    pub logos: Option<LogoPair>,
    #[serde(default)]
    pub footer_company_name: Option<String>,
    #[serde(default)]
    pub footer_company_address: Option<String>,
    /// Applied to the document type label on the cover page.
    #[serde(default)]
    pub accent_color: Option<[u8; 3]>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Requester {
    pub company_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyValue {
    pub label: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl KeyValue {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: Some(value.into()),
        }
    }

    pub fn unset(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpecItem {
    pub description: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub specification: String,
    #[serde(default)]
    pub image: Option<ImageAsset>,
}

/// One technical attribute: either a labelled value or a line of the items table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecRow {
    Attribute(KeyValue),
    Item(SpecItem),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub label: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContactBlock {
    pub role: String,
    pub name: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

/// A cost component the counterpart prices. The amount is intentionally absent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommercialLineItem {
    pub component: String,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Submission {
    pub deadline: String,
    #[serde(default)]
    pub submit_to: String,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub annexures: Vec<String>,
    #[serde(default)]
    pub terms_and_conditions: String,
}

/// Everything needed to render one RFQ document. Built once by the caller and
/// never modified during rendering.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub title: String,
    #[serde(default)]
    pub subject: Vec<String>,
    #[serde(default)]
    pub rfq_number: String,
    #[serde(default)]
    pub issue_date: String,
    #[serde(default)]
    pub generated_on: Option<String>,
    pub requester: Requester,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub technical_spec: Vec<SpecRow>,
    #[serde(default)]
    pub timelines: Vec<TimelineEntry>,
    #[serde(default)]
    pub contacts: Vec<ContactBlock>,
    #[serde(default)]
    pub commercial_items: Vec<CommercialLineItem>,
    #[serde(default)]
    pub commercial_terms: Vec<KeyValue>,
    pub submission: Submission,
    #[serde(default)]
    pub branding: Option<BrandingAssets>,
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

impl DocumentRecord {
    /// Check the fields the composer dereferences unconditionally.
    pub fn validate(&self) -> Result<(), Error> {
        let missing = |field: &'static str| Err(Error::InvalidRecord { field });
        if is_blank(&self.title) {
            return missing("title");
        }
        if is_blank(&self.requester.company_name) {
            return missing("requester.company_name");
        }
        match self.contacts.first() {
            None => return missing("contacts"),
            Some(primary) if is_blank(&primary.name) => return missing("contacts[0].name"),
            Some(_) => {}
        }
        if self.commercial_items.is_empty() {
            return missing("commercial_items");
        }
        if is_blank(&self.submission.deadline) {
            return missing("submission.deadline");
        }
        Ok(())
    }

    pub fn primary_contact(&self) -> Option<&ContactBlock> {
        self.contacts.first()
    }

    pub fn secondary_contact(&self) -> Option<&ContactBlock> {
        self.contacts.get(1).filter(|c| !is_blank(&c.name))
    }
}
