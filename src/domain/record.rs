use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::value::{format_float, Value};

/// One listing unit in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub asset: AssetPath,
    /// Identity name; the checkpoint key
    pub name: String,
    pub link: String,
    pub description: String,
    pub collection: String,
    pub properties: Vec<Attribute>,
    pub levels: Vec<Attribute>,
    pub stats: Vec<Attribute>,
    pub unlockable: UnlockableContent,
    pub explicit_content: bool,
    pub supply: u32,
    pub blockchain: String,
    pub listing_type: String,
    /// `None` when the source value is missing or not a number
    pub price: Option<Price>,
    pub sale_method: SaleMethod,
    pub duration: ListingDuration,
    pub specific_buyer: SpecificBuyer,
    pub quantity: Option<u32>,
    /// Assigned by the marketplace on upload
    pub remote_url: Option<String>,
    /// Set when the record was listed for sale
    pub sale_date: Option<String>,
}

impl Record {
    pub fn is_timed_auction(&self) -> bool {
        self.listing_type.contains("Timed")
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// Positional values in schema order, ready for a checkpoint line.
    /// The sale timestamp is appended only when present.
    pub fn to_fields(&self) -> Vec<Value> {
        let mut fields = vec![
            self.asset.to_value(),
            Value::text(&self.name),
            Value::text(&self.link),
            Value::text(&self.description),
            Value::text(&self.collection),
            attributes_value(&self.properties),
            attributes_value(&self.levels),
            attributes_value(&self.stats),
            self.unlockable.to_value(),
            Value::Bool(self.explicit_content),
            Value::Int(self.supply as i64),
            Value::text(&self.blockchain),
            Value::text(&self.listing_type),
            self.price.map(Price::to_value).unwrap_or_else(|| Value::text("")),
            self.sale_method.to_value(),
            self.duration.to_value(),
            self.specific_buyer.to_value(),
            self.quantity
                .map(|q| Value::Int(q as i64))
                .unwrap_or_else(|| Value::text("")),
            Value::text(self.remote_url.clone().unwrap_or_default()),
        ];
        if let Some(date) = &self.sale_date {
            fields.push(Value::text(date));
        }
        fields
    }
}

fn attributes_value(attributes: &[Attribute]) -> Value {
    Value::List(attributes.iter().map(|a| Value::List(a.0.clone())).collect())
}

/// Local asset location; media files carry a separate preview image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AssetPath {
    Single(PathBuf),
    WithPreview { primary: PathBuf, preview: PathBuf },
}

impl AssetPath {
    pub fn primary(&self) -> &PathBuf {
        match self {
            AssetPath::Single(p) => p,
            AssetPath::WithPreview { primary, .. } => primary,
        }
    }

    pub fn preview(&self) -> Option<&PathBuf> {
        match self {
            AssetPath::Single(_) => None,
            AssetPath::WithPreview { preview, .. } => Some(preview),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            AssetPath::Single(p) => Value::text(p.to_string_lossy()),
            AssetPath::WithPreview { primary, preview } => Value::List(vec![
                Value::text(primary.to_string_lossy()),
                Value::text(preview.to_string_lossy()),
            ]),
        }
    }
}

/// A property, level or stat: `[type, name]` or `[name, value, max]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute(pub Vec<Value>);

impl Attribute {
    pub fn label(&self) -> String {
        self.0.first().map(Value::to_text).unwrap_or_default()
    }

    pub fn value(&self) -> String {
        self.0.get(1).map(Value::to_text).unwrap_or_default()
    }

    pub fn max(&self) -> Option<String> {
        self.0.get(2).map(Value::to_text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UnlockableContent {
    Disabled,
    Enabled(String),
}

impl UnlockableContent {
    fn to_value(&self) -> Value {
        match self {
            UnlockableContent::Disabled => Value::Bool(false),
            UnlockableContent::Enabled(text) => {
                Value::List(vec![Value::Bool(true), Value::text(text)])
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SpecificBuyer {
    Unrestricted,
    RestrictedTo(String),
}

impl SpecificBuyer {
    fn to_value(&self) -> Value {
        match self {
            SpecificBuyer::Unrestricted => Value::Bool(false),
            SpecificBuyer::RestrictedTo(address) => {
                Value::List(vec![Value::Bool(true), Value::text(address)])
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ListingDuration {
    Unset,
    /// A preset such as `1 week`
    Label(String),
    /// Explicit window, both ends in `DD-MM-YYYY HH:MM`
    Range { start: String, end: String },
}

impl ListingDuration {
    fn to_value(&self) -> Value {
        match self {
            ListingDuration::Unset => Value::text(""),
            ListingDuration::Label(label) => Value::text(label),
            ListingDuration::Range { start, end } => {
                Value::List(vec![Value::text(start), Value::text(end)])
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleMethodKind {
    DecliningPrice,
    HighestBidder,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SaleMethod {
    Unset,
    Method {
        name: String,
        /// Ending price (declining) or reserve price (highest bidder)
        secondary: Option<Price>,
    },
}

impl SaleMethod {
    pub fn kind(&self) -> Option<SaleMethodKind> {
        match self {
            SaleMethod::Unset => None,
            SaleMethod::Method { name, .. } => {
                let name = name.to_lowercase();
                Some(if name.contains("declining") {
                    SaleMethodKind::DecliningPrice
                } else if name.contains("highest") {
                    SaleMethodKind::HighestBidder
                } else {
                    SaleMethodKind::Other
                })
            }
        }
    }

    fn to_value(&self) -> Value {
        match self {
            SaleMethod::Unset => Value::text(""),
            SaleMethod::Method { name, secondary } => Value::List(vec![
                Value::text(name),
                secondary.map(Price::to_value).unwrap_or_else(|| Value::text("")),
            ]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Price {
    Int(i64),
    Decimal(f64),
}

impl Price {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => Some(Price::Int(*n)),
            Value::Float(f) if f.is_finite() => Some(Price::Decimal(*f)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Price::Int(n) => *n as f64,
            Price::Decimal(f) => *f,
        }
    }

    /// Fixed eight-decimal form typed into price inputs
    pub fn form_value(&self) -> String {
        format!("{:.8}", self.as_f64())
    }

    fn to_value(self) -> Value {
        match self {
            Price::Int(n) => Value::Int(n),
            Price::Decimal(f) => Value::Float(f),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Int(n) => write!(f, "{}", n),
            Price::Decimal(x) => f.write_str(&format_float(*x)),
        }
    }
}
