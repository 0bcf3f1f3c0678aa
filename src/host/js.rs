//! Host capabilities forwarded to a JavaScript bridge object.
//!
//! The page supplies an object whose methods wrap Office.js calls and return
//! promises. Rejections become [`XlpaneError::Host`]; a `subscribe` or
//! `subscribeWorkbook` that resolves to `null` means the running Excel does
//! not offer that event and becomes [`XlpaneError::HostUnavailable`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::error::{Result, XlpaneError};
use crate::host::{
    ColorSource, ColorTargets, EventHost, NameRegistry, PaneHost, RangeGeometry, SelectionHost,
    SheetInfo, WorkbookRanges,
};
use crate::watcher::{EventKind, SubscriptionHandle, WorkbookEventKind};

#[wasm_bindgen]
extern "C" {
    /// Office.js glue object provided by the embedding page.
    pub type HostBridge;

    #[wasm_bindgen(method, catch, js_name = selectedAddress)]
    async fn selected_address(this: &HostBridge) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = sheetName)]
    async fn sheet_name(this: &HostBridge, sheet_id: &str)
        -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = selectionColor)]
    async fn selection_color(this: &HostBridge, source: &str)
        -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = formatSelection)]
    async fn format_selection(
        this: &HostBridge,
        color: &str,
        targets: JsValue,
    ) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = clearSelectionFormat)]
    async fn clear_selection_format(this: &HostBridge) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = resolveName)]
    async fn resolve_name(this: &HostBridge, name: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = listSheets)]
    async fn list_sheets(this: &HostBridge) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch)]
    async fn subscribe(
        this: &HostBridge,
        sheet_id: &str,
        kind: &str,
    ) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = subscribeWorkbook)]
    async fn subscribe_workbook(this: &HostBridge, kind: &str)
        -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch)]
    async fn unsubscribe(this: &HostBridge, handle: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch)]
    async fn intersect(
        this: &HostBridge,
        sheet: &str,
        a: &str,
        b: &str,
    ) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = findSheet)]
    async fn find_sheet(this: &HostBridge, name: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = addHiddenSheet)]
    async fn add_hidden_sheet(this: &HostBridge, name: &str)
        -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = readRange)]
    async fn read_range(
        this: &HostBridge,
        sheet: &str,
        range: &str,
    ) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = writeRange)]
    async fn write_range(
        this: &HostBridge,
        sheet: &str,
        range: &str,
        values: JsValue,
    ) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setTextFormat)]
    async fn set_text_format(
        this: &HostBridge,
        sheet: &str,
        range: &str,
    ) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = showPane)]
    async fn show_pane(this: &HostBridge) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = hidePane)]
    async fn hide_pane(this: &HostBridge) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, js_name = reportError)]
    fn report_error(this: &HostBridge, action: &str, message: &str);
}

/// Turn a rejected promise into a host error, keeping the JS message.
fn js_error(value: &JsValue) -> XlpaneError {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return XlpaneError::Host(String::from(err.message()));
    }
    XlpaneError::Host(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

fn decode<T: DeserializeOwned>(value: JsValue) -> Result<T> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| XlpaneError::Host(format!("unexpected bridge payload: {e}")))
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| XlpaneError::Host(format!("could not encode bridge argument: {e}")))
}

fn string_result(value: std::result::Result<JsValue, JsValue>) -> Result<String> {
    let value = value.map_err(|e| js_error(&e))?;
    value
        .as_string()
        .ok_or_else(|| XlpaneError::Host(format!("expected a string, got {value:?}")))
}

fn optional_string(value: std::result::Result<JsValue, JsValue>) -> Result<Option<String>> {
    let value = value.map_err(|e| js_error(&e))?;
    if value.is_null() || value.is_undefined() {
        return Ok(None);
    }
    Ok(value.as_string().filter(|s| !s.is_empty()))
}

fn unit_result(value: std::result::Result<JsValue, JsValue>) -> Result<()> {
    value.map(|_| ()).map_err(|e| js_error(&e))
}

fn handle_result(
    value: std::result::Result<JsValue, JsValue>,
    what: String,
) -> Result<SubscriptionHandle> {
    let value = value.map_err(|e| js_error(&e))?;
    if value.is_null() || value.is_undefined() {
        return Err(XlpaneError::HostUnavailable(what));
    }
    match value.as_string() {
        Some(handle) => Ok(SubscriptionHandle(handle)),
        None => Err(XlpaneError::Host(format!(
            "expected a subscription handle, got {value:?}"
        ))),
    }
}

/// [`Host`](crate::host::Host) backed by a [`HostBridge`].
pub struct JsHost {
    bridge: HostBridge,
}

impl JsHost {
    pub fn new(bridge: HostBridge) -> Self {
        Self { bridge }
    }
}

impl SelectionHost for JsHost {
    async fn selected_address(&self) -> Result<String> {
        string_result(self.bridge.selected_address().await)
    }

    async fn sheet_name(&self, sheet_id: &str) -> Result<String> {
        string_result(self.bridge.sheet_name(sheet_id).await)
    }

    async fn selection_color(&self, source: ColorSource) -> Result<Option<String>> {
        optional_string(self.bridge.selection_color(source.as_str()).await)
    }

    async fn format_selection(&self, color: &str, targets: ColorTargets) -> Result<()> {
        let targets = encode(&targets)?;
        unit_result(self.bridge.format_selection(color, targets).await)
    }

    async fn clear_selection_format(&self) -> Result<()> {
        unit_result(self.bridge.clear_selection_format().await)
    }
}

impl NameRegistry for JsHost {
    async fn resolve_name(&self, name: &str) -> Result<Option<String>> {
        optional_string(self.bridge.resolve_name(name).await)
    }
}

impl EventHost for JsHost {
    async fn list_sheets(&self) -> Result<Vec<SheetInfo>> {
        let value = self.bridge.list_sheets().await.map_err(|e| js_error(&e))?;
        decode(value)
    }

    async fn subscribe(&self, sheet_id: &str, kind: EventKind) -> Result<SubscriptionHandle> {
        handle_result(
            self.bridge.subscribe(sheet_id, kind.as_str()).await,
            format!("worksheet {} event", kind.as_str()),
        )
    }

    async fn subscribe_workbook(&self, kind: WorkbookEventKind) -> Result<SubscriptionHandle> {
        handle_result(
            self.bridge.subscribe_workbook(kind.as_str()).await,
            format!("workbook {} event", kind.as_str()),
        )
    }

    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()> {
        unit_result(self.bridge.unsubscribe(&handle.0).await)
    }
}

impl RangeGeometry for JsHost {
    async fn intersect(&self, sheet: &str, a: &str, b: &str) -> Result<Option<String>> {
        optional_string(self.bridge.intersect(sheet, a, b).await)
    }
}

impl WorkbookRanges for JsHost {
    async fn find_sheet(&self, name: &str) -> Result<Option<SheetInfo>> {
        let value = self.bridge.find_sheet(name).await.map_err(|e| js_error(&e))?;
        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }
        decode(value).map(Some)
    }

    async fn add_hidden_sheet(&self, name: &str) -> Result<SheetInfo> {
        let value = self
            .bridge
            .add_hidden_sheet(name)
            .await
            .map_err(|e| js_error(&e))?;
        decode(value)
    }

    async fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let value = self
            .bridge
            .read_range(sheet, range)
            .await
            .map_err(|e| js_error(&e))?;
        // Office.js hands back numbers and booleans for non-text cells.
        let rows: Vec<Vec<serde_json::Value>> = decode(value)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect())
    }

    async fn write_range(&self, sheet: &str, range: &str, values: &[Vec<String>]) -> Result<()> {
        let values = encode(values)?;
        unit_result(self.bridge.write_range(sheet, range, values).await)
    }

    async fn set_text_format(&self, sheet: &str, range: &str) -> Result<()> {
        unit_result(self.bridge.set_text_format(sheet, range).await)
    }
}

impl PaneHost for JsHost {
    async fn show_pane(&self) -> Result<()> {
        unit_result(self.bridge.show_pane().await)
    }

    async fn hide_pane(&self) -> Result<()> {
        unit_result(self.bridge.hide_pane().await)
    }

    fn report_error(&self, action: &str, message: &str) {
        self.bridge.report_error(action, message);
    }

    fn now_ms(&self) -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map_or_else(js_sys::Date::now, |p| p.now())
    }
}
