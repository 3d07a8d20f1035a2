//! Generated CDN distribution rows, the demo data set

use serde::{Deserialize, Serialize};
use tabula_common::{
    columns::ColumnDefinition,
    fetch::Row,
    ids::{ColumnId, RowId},
};

use crate::table::Searchable;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: String,
    pub domain_name: String,
    pub delivery_method: String,
    pub price_class: String,
    pub ssl_certificate: String,
    pub origin: String,
    pub state: String,
    pub logging: String,
}

impl Row for Distribution {
    fn id(&self) -> RowId {
        RowId::new(self.id.clone())
    }
}

impl Distribution {
    fn field(&self, column: &str) -> Option<&str> {
        Some(match column {
            "id" => self.id.as_str(),
            "domainName" => self.domain_name.as_str(),
            "deliveryMethod" => self.delivery_method.as_str(),
            "priceClass" => self.price_class.as_str(),
            "sslCertificate" => self.ssl_certificate.as_str(),
            "origin" => self.origin.as_str(),
            "state" => self.state.as_str(),
            "logging" => self.logging.as_str(),
            _ => return None,
        })
    }

    fn text_fields(&self) -> [&str; 8] {
        [
            self.id.as_str(),
            self.domain_name.as_str(),
            self.delivery_method.as_str(),
            self.price_class.as_str(),
            self.ssl_certificate.as_str(),
            self.origin.as_str(),
            self.state.as_str(),
            self.logging.as_str(),
        ]
    }
}

impl Searchable for Distribution {
    fn sort_key(&self, column: &ColumnId) -> Option<String> {
        self.field(column.as_str()).map(str::to_lowercase)
    }

    fn matches(&self, needle: &str) -> bool {
        self.text_fields()
            .iter()
            .any(|f| f.to_lowercase().contains(needle))
    }
}

/// Column set for the distributions table
pub fn distribution_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", "Distribution ID").with_width(180),
        ColumnDefinition::new("state", "State"),
        ColumnDefinition::new("domainName", "Domain name").with_min_width(200),
        ColumnDefinition::new("deliveryMethod", "Delivery method"),
        ColumnDefinition::new("sslCertificate", "SSL certificate"),
        ColumnDefinition::new("priceClass", "Price class"),
        ColumnDefinition::new("logging", "Logging"),
        ColumnDefinition::new("origin", "Origin").unsortable(),
    ]
}

// =============================================================================

const DELIVERY_METHODS: &[&str] = &["Web", "RTMP"];
const PRICE_CLASSES: &[&str] = &[
    "Use all edge locations (best performance)",
    "Use only US, Canada, Europe, and Asia",
    "Use only US, Canada, and Europe",
];
const SSL_CERTIFICATES: &[&str] =
    &["Default CloudFront SSL certificate", "Custom SSL certificate"];
const STATES: &[&str] = &["Activated", "Deactivated", "Activating"];
const LOGGING: &[&str] = &["Enabled", "Disabled"];
const ORIGIN_WORDS: &[&str] = &[
    "assets", "media", "static", "images", "video", "archive", "docs",
    "downloads", "backups", "public",
];

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// splitmix64; enough to make stable looking demo data
pub(crate) struct Mixer(u64);

impl Mixer {
    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub(crate) fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[(self.next() % options.len() as u64) as usize]
    }
}

/// Generate `count` distributions. The same seed gives the same rows.
pub fn generate_distributions(count: usize, seed: u64) -> Vec<Distribution> {
    let mut mixer = Mixer::new(seed);

    (0..count)
        .map(|i| {
            let id: String = std::iter::once('E')
                .chain((0..13).map(|_| {
                    let n = mixer.next() % ID_ALPHABET.len() as u64;
                    ID_ALPHABET[n as usize] as char
                }))
                .collect();

            let host: String = (0..14)
                .map(|_| (b'a' + (mixer.next() % 26) as u8) as char)
                .collect();

            let origin = format!(
                "{}-{}-{i}.s3.amazonaws.com",
                mixer.pick(ORIGIN_WORDS),
                mixer.pick(ORIGIN_WORDS)
            );

            Distribution {
                id,
                domain_name: format!("{host}.cloudfront.net"),
                delivery_method: mixer.pick(DELIVERY_METHODS).to_string(),
                price_class: mixer.pick(PRICE_CLASSES).to_string(),
                ssl_certificate: mixer.pick(SSL_CERTIFICATES).to_string(),
                origin,
                state: mixer.pick(STATES).to_string(),
                logging: mixer.pick(LOGGING).to_string(),
            }
        })
        .collect()
}
