//! Stripe REST implementation of [`CommerceApi`].
//!
//! Thin blocking client: bearer auth, form-encoded bodies, JSON responses.
//! Products are listed with `default_price` expanded and paginated at the
//! API maximum of 100 until `has_more` clears, so the reconciler's preload
//! sees the whole account. All mutating calls also expand `default_price`
//! to keep [`Product`] deserialization uniform.

use super::{
    CommerceApi, CommerceError, PaymentLink, PaymentLinkCreate, Price, PriceCreate, Product,
    ProductCreate, ProductUpdate,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

const API_BASE: &str = "https://api.stripe.com/v1";
const PAGE_SIZE: u32 = 100;

#[derive(Debug, serde::Deserialize)]
struct ProductPage {
    data: Vec<Product>,
    has_more: bool,
}

pub struct StripeClient {
    client: reqwest::blocking::Client,
    api_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(api_key: &str) -> Result<Self, CommerceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            api_base: API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root (test servers).
    #[cfg(test)]
    pub fn with_base(api_key: &str, api_base: &str) -> Result<Self, CommerceError> {
        let mut client = Self::new(api_key)?;
        client.api_base = api_base.trim_end_matches('/').to_string();
        Ok(client)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, operation: &str) -> Result<T, CommerceError> {
        let response = self
            .client
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.api_key)
            .send()?;
        Self::parse(response, operation)
    }

    fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
        operation: &str,
    ) -> Result<T, CommerceError> {
        let response = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.api_key)
            .form(form)
            .send()?;
        Self::parse(response, operation)
    }

    fn parse<T: DeserializeOwned>(
        response: reqwest::blocking::Response,
        operation: &str,
    ) -> Result<T, CommerceError> {
        let status = response.status();
        if !status.is_success() {
            return Err(CommerceError::Api {
                operation: operation.to_string(),
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }
        Ok(response.json()?)
    }
}

fn form_pair(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

impl CommerceApi for StripeClient {
    fn list_products(&self) -> Result<Vec<Product>, CommerceError> {
        let mut products = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut path = format!(
                "/products?limit={PAGE_SIZE}&expand[]=data.default_price"
            );
            if let Some(cursor) = &starting_after {
                path.push_str(&format!("&starting_after={cursor}"));
            }
            let page: ProductPage = self.get(&path, "list products")?;
            let last_id = page.data.last().map(|p| p.id.clone());
            products.extend(page.data);
            if !page.has_more {
                break;
            }
            starting_after = last_id;
        }

        Ok(products)
    }

    fn create_product(&self, req: &ProductCreate) -> Result<Product, CommerceError> {
        let mut form = vec![
            form_pair("id", &req.id),
            form_pair("name", &req.name),
            form_pair("description", &req.description),
            form_pair("type", "good"),
            form_pair("tax_code", &req.tax_code),
            form_pair("expand[]", "default_price"),
        ];
        for (i, image) in req.images.iter().enumerate() {
            form.push(form_pair(&format!("images[{i}]"), image));
        }
        self.post("/products", &form, "create product")
    }

    fn update_product(&self, id: &str, req: &ProductUpdate) -> Result<Product, CommerceError> {
        let mut form = vec![form_pair("expand[]", "default_price")];
        if let Some(name) = &req.name {
            form.push(form_pair("name", name));
        }
        if let Some(images) = &req.images {
            for (i, image) in images.iter().enumerate() {
                form.push(form_pair(&format!("images[{i}]"), image));
            }
        }
        if let Some(tax_code) = &req.tax_code {
            form.push(form_pair("tax_code", tax_code));
        }
        if let Some(price_id) = &req.default_price {
            form.push(form_pair("default_price", price_id));
        }
        if let Some(metadata) = &req.metadata {
            for (key, value) in metadata {
                form.push(form_pair(&format!("metadata[{key}]"), value));
            }
        }
        self.post(&format!("/products/{id}"), &form, "update product")
    }

    fn create_price(&self, req: &PriceCreate) -> Result<Price, CommerceError> {
        let form = vec![
            form_pair("product", &req.product),
            form_pair("currency", &req.currency),
            form_pair("unit_amount", req.unit_amount),
            form_pair("nickname", &req.nickname),
        ];
        self.post("/prices", &form, "create price")
    }

    fn get_payment_link(&self, id: &str) -> Result<PaymentLink, CommerceError> {
        self.get(&format!("/payment_links/{id}"), "get payment link")
    }

    fn create_payment_link(
        &self,
        req: &PaymentLinkCreate,
    ) -> Result<PaymentLink, CommerceError> {
        let form = vec![
            form_pair("line_items[0][price]", &req.price),
            form_pair("line_items[0][quantity]", req.quantity),
            form_pair(
                "allow_promotion_codes",
                req.allow_promotion_codes,
            ),
        ];
        self.post("/payment_links", &form, "create payment link")
    }
}
