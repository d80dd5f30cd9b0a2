use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A trusted catalog entry. The caller supplies these; the core never infers
/// a product or a price from free text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRef {
    pub product_code: String,
    pub list_price: Decimal,
}

#[derive(Clone, Debug, Default)]
pub struct ProductCatalog {
    products: Vec<ProductRef>,
}

impl ProductCatalog {
    pub fn new(products: Vec<ProductRef>) -> Self {
        Self { products }
    }

    pub fn find(&self, product_code: &str) -> Option<&ProductRef> {
        self.products.iter().find(|product| product.product_code == product_code)
    }

    pub fn products(&self) -> &[ProductRef] {
        &self.products
    }
}
