//! Commerce reconciliation: product, price, and payment link per photo.
//!
//! For every sellable photo the remote commerce account must hold exactly
//! one product (keyed by the photo's `uniqueID`), one default price, and one
//! payment link. Runs repeat — after re-edits, after new photos join an
//! album — so the reconciler is a three-stage idempotent upsert where each
//! stage is independently skipped when the remote object already exists:
//!
//! 1. **Product** — preloaded index hit reuses (optionally refreshing name,
//!    image set, and tax code); miss creates with `uniqueID` as the key.
//! 2. **Price** — the product's default price is reused; otherwise one is
//!    created and set as the default.
//! 3. **Payment link** — the product's `payment_link` metadata entry names
//!    the link to fetch and reuse; otherwise a new link is created and its
//!    id persisted back into the metadata for the next run.
//!
//! Failures anywhere in the chain propagate and abort the run. This path
//! runs under human supervision on new photos, so a full diagnostic at the
//! terminal beats a silently skipped product.
//!
//! The [`CommerceApi`] trait is the seam to the vendor; the production
//! implementation is [`stripe::StripeClient`].

pub mod stripe;

use std::collections::HashMap;
use thiserror::Error;

/// Photos whose largest edge reaches this many pixels are print-quality.
const MIN_PRINT_EDGE: u32 = 3000;

/// Product metadata key that records the payment link across runs.
const PAYMENT_LINK_METADATA_KEY: &str = "payment_link";

/// Tax classification for downloadable photographs.
const PHOTO_TAX_CODE: &str = "txcd_10501000";

const PRICE_NICKNAME: &str = "Original Image File Download";

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Commerce API rejected {operation} with status {status}: {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },
}

/// A remote product. `default_price` arrives expanded on list/create.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub default_price: Option<Price>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Price {
    pub id: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ProductCreate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub tax_code: String,
}

/// Partial product update; `None` fields are left untouched remotely.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub images: Option<Vec<String>>,
    pub tax_code: Option<String>,
    pub default_price: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct PriceCreate {
    pub product: String,
    pub currency: String,
    pub unit_amount: i64,
    pub nickname: String,
}

#[derive(Debug, Clone)]
pub struct PaymentLinkCreate {
    pub price: String,
    pub quantity: u64,
    pub allow_promotion_codes: bool,
}

/// Vendor-agnostic commerce operations the reconciler needs.
pub trait CommerceApi {
    /// List every product in the account, default prices expanded.
    fn list_products(&self) -> Result<Vec<Product>, CommerceError>;
    fn create_product(&self, req: &ProductCreate) -> Result<Product, CommerceError>;
    fn update_product(&self, id: &str, req: &ProductUpdate) -> Result<Product, CommerceError>;
    fn create_price(&self, req: &PriceCreate) -> Result<Price, CommerceError>;
    fn get_payment_link(&self, id: &str) -> Result<PaymentLink, CommerceError>;
    fn create_payment_link(&self, req: &PaymentLinkCreate)
    -> Result<PaymentLink, CommerceError>;
}

/// Per-photo inputs to reconciliation.
#[derive(Debug, Clone)]
pub struct PhotoListing {
    pub unique_id: String,
    pub title: String,
    pub caption: String,
    pub file_size_mb: u64,
    pub width: u32,
    pub height: u32,
    /// Rendition URLs suitable as product images (checkout page thumbnails).
    pub thumbnails: Vec<String>,
}

/// Reconciliation settings, carved out of [`crate::config::CommerceConfig`].
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub update_products: bool,
    pub currency: String,
    pub unit_amount: i64,
    pub not_for_sale: Vec<String>,
}

/// Holds the preloaded product index and drives the three-stage upsert.
pub struct Reconciler<'a> {
    api: &'a dyn CommerceApi,
    settings: ReconcileSettings,
    products: HashMap<String, Product>,
}

impl<'a> Reconciler<'a> {
    /// Preload the full remote product index so per-photo existence checks
    /// are lookups, not API calls.
    pub fn new(
        api: &'a dyn CommerceApi,
        settings: ReconcileSettings,
    ) -> Result<Self, CommerceError> {
        let products = api
            .list_products()?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Ok(Self {
            api,
            settings,
            products,
        })
    }

    /// Whether a photo is offered for sale.
    ///
    /// A photo escapes the not-for-sale list whenever its largest edge falls
    /// below the print threshold — the list only withholds print-quality
    /// originals.
    pub fn is_eligible(&self, unique_id: &str, width: u32, height: u32) -> bool {
        !self.settings.not_for_sale.iter().any(|id| id == unique_id)
            || width.max(height) < MIN_PRINT_EDGE
    }

    /// Ensure product, default price, and payment link exist for the photo,
    /// creating only what is missing. Returns the public purchase URL.
    pub fn reconcile(&mut self, listing: &PhotoListing) -> Result<String, CommerceError> {
        let product = match self.products.get(&listing.unique_id) {
            Some(existing) => {
                let mut product = existing.clone();
                if self.settings.update_products {
                    product = self.api.update_product(
                        &listing.unique_id,
                        &ProductUpdate {
                            name: Some(listing.title.clone()),
                            images: Some(listing.thumbnails.clone()),
                            tax_code: Some(PHOTO_TAX_CODE.to_string()),
                            ..ProductUpdate::default()
                        },
                    )?;
                    // Refreshes don't expand the default price; keep the
                    // preloaded one.
                    if product.default_price.is_none() {
                        product.default_price = existing.default_price.clone();
                    }
                }
                product
            }
            None => self.api.create_product(&ProductCreate {
                id: listing.unique_id.clone(),
                name: listing.title.clone(),
                description: product_description(listing),
                images: listing.thumbnails.clone(),
                tax_code: PHOTO_TAX_CODE.to_string(),
            })?,
        };

        let price = match &product.default_price {
            Some(price) => price.clone(),
            None => {
                let price = self.api.create_price(&PriceCreate {
                    product: product.id.clone(),
                    currency: self.settings.currency.clone(),
                    unit_amount: self.settings.unit_amount,
                    nickname: PRICE_NICKNAME.to_string(),
                })?;
                self.api.update_product(
                    &product.id,
                    &ProductUpdate {
                        default_price: Some(price.id.clone()),
                        ..ProductUpdate::default()
                    },
                )?;
                price
            }
        };

        let link = match product.metadata.get(PAYMENT_LINK_METADATA_KEY) {
            Some(link_id) => self.api.get_payment_link(link_id)?,
            None => {
                let link = self.api.create_payment_link(&PaymentLinkCreate {
                    price: price.id.clone(),
                    quantity: 1,
                    allow_promotion_codes: true,
                })?;
                self.api.update_product(
                    &product.id,
                    &ProductUpdate {
                        metadata: Some(HashMap::from([(
                            PAYMENT_LINK_METADATA_KEY.to_string(),
                            link.id.clone(),
                        )])),
                        ..ProductUpdate::default()
                    },
                )?;
                link
            }
        };

        // Keep the in-run index consistent so a second reconcile of the
        // same identity reuses everything just created.
        let mut cached = product;
        cached.default_price = Some(price);
        cached
            .metadata
            .insert(PAYMENT_LINK_METADATA_KEY.to_string(), link.id.clone());
        self.products.insert(cached.id.clone(), cached);

        Ok(link.url)
    }
}

/// Product description shown on the checkout page.
fn product_description(listing: &PhotoListing) -> String {
    let caption = if listing.caption.trim().is_empty() {
        String::new()
    } else {
        format!("({})", listing.caption)
    };
    format!(
        "Original digital file for this photograph, JPEG format, uncompressed and {}px x {}px. {}MB. Suitable for large format printing. {}",
        listing.width, listing.height, listing.file_size_mb, caption
    )
}
