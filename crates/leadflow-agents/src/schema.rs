//! Properties table layout.
//!
//! Column names default to the production base and can each be overridden
//! through an environment variable, so a base with renamed columns needs no
//! code change.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Table and column names of the Properties table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
pub struct PropertySchema {
    /// Name of the table holding properties.
    #[cfg_attr(
        feature = "config",
        arg(long = "properties-table", env = "PROPERTIES_TABLE", default_value = "Properties")
    )]
    pub table: String,

    /// Street address.
    #[cfg_attr(
        feature = "config",
        arg(long = "property-address-field", env = "PROPERTY_ADDRESS_FIELD", default_value = "Address")
    )]
    pub address: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-city-field", env = "PROPERTY_CITY_FIELD", default_value = "City")
    )]
    pub city: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-state-field", env = "PROPERTY_STATE_FIELD", default_value = "State")
    )]
    pub state: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-zip-field", env = "PROPERTY_ZIP_FIELD", default_value = "Zip")
    )]
    pub zip: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-year-built-field", env = "PROPERTY_YEAR_BUILT_FIELD", default_value = "Year Built")
    )]
    pub year_built: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-beds-field", env = "PROPERTY_BEDS_FIELD", default_value = "Beds")
    )]
    pub beds: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-baths-field", env = "PROPERTY_BATHS_FIELD", default_value = "Baths")
    )]
    pub baths: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-sqft-field", env = "PROPERTY_SQFT_FIELD", default_value = "Square Feet")
    )]
    pub square_feet: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-lot-size-field", env = "PROPERTY_LOT_SIZE_FIELD", default_value = "Lot Size")
    )]
    pub lot_size: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-type-field", env = "PROPERTY_TYPE_FIELD", default_value = "Property Type")
    )]
    pub property_type: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-vacancy-field", env = "PROPERTY_VACANCY_FIELD", default_value = "Vacancy")
    )]
    pub vacancy: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-owner-type-field", env = "PROPERTY_OWNER_TYPE_FIELD", default_value = "Owner Type")
    )]
    pub owner_type: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-ownership-length-field", env = "PROPERTY_OWNERSHIP_LENGTH_FIELD", default_value = "Ownership Length")
    )]
    pub ownership_length: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-preforeclosure-field", env = "PROPERTY_PREFORECLOSURE_FIELD", default_value = "Preforeclosure")
    )]
    pub preforeclosure: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-tax-delinquent-field", env = "PROPERTY_TAX_DELINQUENT_FIELD", default_value = "Tax Delinquent")
    )]
    pub tax_delinquent: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-liens-field", env = "PROPERTY_LIENS_FIELD", default_value = "Liens")
    )]
    pub liens: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-auction-date-field", env = "PROPERTY_AUCTION_DATE_FIELD", default_value = "Auction Date")
    )]
    pub auction_date: String,

    /// Date of the last sale, checked before asking the model.
    #[cfg_attr(
        feature = "config",
        arg(long = "property-last-sold-date-field", env = "PROPERTY_LAST_SOLD_DATE_FIELD", default_value = "Last Sold Date")
    )]
    pub last_sold_date: String,

    /// Alternate sale date column, checked after `last_sold_date`.
    #[cfg_attr(
        feature = "config",
        arg(long = "property-last-sale-date-field", env = "PROPERTY_LAST_SALE_DATE_FIELD", default_value = "Last Sale Date")
    )]
    pub last_sale_date: String,

    #[cfg_attr(
        feature = "config",
        arg(long = "property-last-sale-price-field", env = "PROPERTY_LAST_SALE_PRICE_FIELD", default_value = "Last Sale Price")
    )]
    pub last_sale_price: String,

    /// Repair estimate subtracted from offers.
    #[cfg_attr(
        feature = "config",
        arg(long = "property-repairs-field", env = "PROPERTY_REPAIRS_FIELD", default_value = "Estimated Repairs")
    )]
    pub estimated_repairs: String,

    /// After-repair value.
    #[cfg_attr(
        feature = "config",
        arg(long = "property-arv-field", env = "PROPERTY_ARV_FIELD", default_value = "ARV")
    )]
    pub arv: String,

    /// Score written by the score agent.
    #[cfg_attr(
        feature = "config",
        arg(long = "property-motivation-field", env = "PROPERTY_MOTIVATION_FIELD", default_value = "Motivation Score")
    )]
    pub motivation_score: String,

    /// Offer written by the offer agent.
    #[cfg_attr(
        feature = "config",
        arg(long = "property-suggested-offer-field", env = "PROPERTY_SUGGESTED_OFFER_FIELD", default_value = "Suggested Offer")
    )]
    pub suggested_offer: String,

    #[cfg_attr(
        feature = "config",
        arg(
            id = "property_offer_type_field",
            long = "property-offer-type-field",
            env = "PROPERTY_OFFER_TYPE_FIELD",
            default_value = "Offer Type"
        )
    )]
    pub offer_type: String,
}

impl Default for PropertySchema {
    fn default() -> Self {
        Self {
            table: "Properties".to_owned(),
            address: "Address".to_owned(),
            city: "City".to_owned(),
            state: "State".to_owned(),
            zip: "Zip".to_owned(),
            year_built: "Year Built".to_owned(),
            beds: "Beds".to_owned(),
            baths: "Baths".to_owned(),
            square_feet: "Square Feet".to_owned(),
            lot_size: "Lot Size".to_owned(),
            property_type: "Property Type".to_owned(),
            vacancy: "Vacancy".to_owned(),
            owner_type: "Owner Type".to_owned(),
            ownership_length: "Ownership Length".to_owned(),
            preforeclosure: "Preforeclosure".to_owned(),
            tax_delinquent: "Tax Delinquent".to_owned(),
            liens: "Liens".to_owned(),
            auction_date: "Auction Date".to_owned(),
            last_sold_date: "Last Sold Date".to_owned(),
            last_sale_date: "Last Sale Date".to_owned(),
            last_sale_price: "Last Sale Price".to_owned(),
            estimated_repairs: "Estimated Repairs".to_owned(),
            arv: "ARV".to_owned(),
            motivation_score: "Motivation Score".to_owned(),
            suggested_offer: "Suggested Offer".to_owned(),
            offer_type: "Offer Type".to_owned(),
        }
    }
}

impl PropertySchema {
    /// Set the table name.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Set the motivation score column.
    #[must_use]
    pub fn with_motivation_score(mut self, field: impl Into<String>) -> Self {
        self.motivation_score = field.into();
        self
    }

    /// Columns listed first in scoring prompts, in prompt order.
    pub fn key_fields(&self) -> [&str; 21] {
        [
            &self.address,
            &self.city,
            &self.state,
            &self.zip,
            &self.year_built,
            &self.beds,
            &self.baths,
            &self.square_feet,
            &self.lot_size,
            &self.property_type,
            &self.vacancy,
            &self.owner_type,
            &self.ownership_length,
            &self.preforeclosure,
            &self.tax_delinquent,
            &self.liens,
            &self.auction_date,
            &self.last_sold_date,
            &self.last_sale_price,
            &self.estimated_repairs,
            &self.arv,
        ]
    }

    /// Sale date columns, in lookup order.
    pub fn sale_date_fields(&self) -> [&str; 2] {
        [&self.last_sold_date, &self.last_sale_date]
    }

    /// Formula matching records whose `field` is empty.
    pub fn blank_formula(field: &str) -> String {
        format!("OR({{{field}}} = '', {{{field}}} = BLANK())")
    }

    /// Rejects empty table or column names.
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(Error::config("properties table name must not be empty"));
        }
        let written = [
            ("motivation score", &self.motivation_score),
            ("suggested offer", &self.suggested_offer),
            ("offer type", &self.offer_type),
        ];
        for (label, name) in written {
            if name.trim().is_empty() {
                return Err(Error::config(format!("{label} column must not be empty")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_base_layout() {
        let schema = PropertySchema::default();
        assert_eq!(schema.table, "Properties");
        assert_eq!(schema.motivation_score, "Motivation Score");
        assert_eq!(schema.key_fields()[0], "Address");
        assert_eq!(schema.key_fields()[20], "ARV");
        assert_eq!(schema.sale_date_fields(), ["Last Sold Date", "Last Sale Date"]);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_blank_formula() {
        assert_eq!(
            PropertySchema::blank_formula("Motivation Score"),
            "OR({Motivation Score} = '', {Motivation Score} = BLANK())"
        );
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let schema: PropertySchema =
            serde_json::from_str(r#"{"table": "Leads", "arv": "After Repair Value"}"#).unwrap();
        assert_eq!(schema.table, "Leads");
        assert_eq!(schema.arv, "After Repair Value");
        assert_eq!(schema.beds, "Beds");
    }

    #[test]
    fn test_validation_rejects_empty_names() {
        assert!(PropertySchema::default().with_table(" ").validate().is_err());
        assert!(
            PropertySchema::default()
                .with_motivation_score("")
                .validate()
                .is_err()
        );
    }
}
