//! Trigger target resolution.
//!
//! The trigger is looked up on every evaluation because users can redefine
//! the named reference at any time.

use serde::{Deserialize, Serialize};

use crate::address::{parse_qualified_address, Address};
use crate::cell_ref::CellRange;
use crate::error::Result;
use crate::host::NameRegistry;

/// Where the trigger cell lives: a workbook name first, then a literal
/// sheet + address pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerConfig {
    pub alias_name: Option<String>,
    pub fallback_sheet: Option<String>,
    pub fallback_address: Option<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            alias_name: Some("PaneTrigger".to_string()),
            fallback_sheet: None,
            fallback_address: None,
        }
    }
}

impl TriggerConfig {
    /// Fallback-only configuration.
    pub fn fallback(sheet: &str, address: &str) -> Self {
        Self {
            alias_name: None,
            fallback_sheet: Some(sheet.to_string()),
            fallback_address: Some(address.to_string()),
        }
    }

    fn alias(&self) -> Option<&str> {
        non_empty(self.alias_name.as_deref())
    }

    fn fallback_pair(&self) -> Option<(&str, &str)> {
        Some((
            non_empty(self.fallback_sheet.as_deref())?,
            non_empty(self.fallback_address.as_deref())?,
        ))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolves the configured trigger to a concrete address.
#[derive(Debug, Clone, Copy)]
pub struct TriggerResolver<'a> {
    config: &'a TriggerConfig,
}

impl<'a> TriggerResolver<'a> {
    pub fn new(config: &'a TriggerConfig) -> Self {
        Self { config }
    }

    /// Alias first, then fallback; `None` means no trigger is configured and
    /// the pane never opens automatically.
    ///
    /// The fallback is returned without checking that its sheet exists; a
    /// stale sheet simply never intersects.
    pub async fn resolve<H: NameRegistry>(&self, host: &H) -> Result<Option<Address>> {
        if let Some(alias) = self.config.alias() {
            if let Some(reference) = host.resolve_name(alias).await? {
                if let Some(addr) = concrete_reference(&reference) {
                    return Ok(Some(addr));
                }
                log::debug!("name {alias} has no concrete reference ({reference}), using fallback");
            }
        }

        Ok(self
            .config
            .fallback_pair()
            .map(|(sheet, address)| Address::new(sheet, address)))
    }
}

/// Parse a named reference, rejecting `#REF!`, constants and sheet-less
/// formulas.
fn concrete_reference(reference: &str) -> Option<Address> {
    if reference.to_ascii_uppercase().contains("#REF!") {
        return None;
    }
    let addr = parse_qualified_address(reference);
    if !addr.has_sheet() || CellRange::parse(&addr.cells).is_none() {
        return None;
    }
    Some(addr)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_concrete_reference() {
        assert_eq!(
            concrete_reference("=Sheet1!$B$2"),
            Some(Address::new("Sheet1", "B2"))
        );
        assert_eq!(
            concrete_reference("='My Sheet'!$A$1:$B$3"),
            Some(Address::new("My Sheet", "A1:B3"))
        );
        assert_eq!(concrete_reference("=#REF!$B$2"), None);
        assert_eq!(concrete_reference("=Sheet1!#REF!"), None);
        assert_eq!(concrete_reference("=42"), None);
        assert_eq!(concrete_reference("=$B$2"), None);
    }

    #[test]
    fn test_blank_config_values_are_unset() {
        let config = TriggerConfig {
            alias_name: Some("  ".into()),
            fallback_sheet: Some("Sheet1".into()),
            fallback_address: Some(String::new()),
        };
        assert_eq!(config.alias(), None);
        assert_eq!(config.fallback_pair(), None);
        assert_eq!(
            TriggerConfig::fallback("Sheet1", "B2").fallback_pair(),
            Some(("Sheet1", "B2"))
        );
    }
}
