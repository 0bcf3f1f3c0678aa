//! JavaScript-facing add-in object.
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { XlPane } from 'xlpane';
//! await init();
//! const pane = new XlPane(bridge, { trigger: { aliasName: 'PaneTrigger' } });
//! await pane.start();
//! // from every Office.js handler registered by the bridge:
//! await pane.handleEvent({ kind: 'selectionChanged', sheetId, address });
//! ```
//!
//! Every method returns a promise that resolves even when the underlying
//! action failed; failures are surfaced through `bridge.reportError`.

use std::rc::Rc;

use js_sys::{Array, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::config::PaneConfig;
use crate::controller::PaneController;
use crate::debounce::PaneAction;
use crate::error::XlpaneError;
use crate::host::js::{HostBridge, JsHost};
use crate::host::{ColorSource, ColorTargets};
use crate::logging;
use crate::watcher::HostEvent;

fn string_array(list: &[String]) -> JsValue {
    list.iter()
        .map(|s| JsValue::from_str(s))
        .collect::<Array>()
        .into()
}

fn action_value(action: Option<PaneAction>) -> JsValue {
    match action {
        Some(PaneAction::Show) => JsValue::from_str("show"),
        Some(PaneAction::Hide) => JsValue::from_str("hide"),
        None => JsValue::NULL,
    }
}

/// One add-in session bound to a workbook.
#[wasm_bindgen]
pub struct XlPane {
    controller: Rc<PaneController<JsHost>>,
}

#[wasm_bindgen]
impl XlPane {
    /// Create the session. `config` may be `undefined` for all defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(bridge: HostBridge, config: JsValue) -> Result<XlPane, JsValue> {
        console_error_panic_hook::set_once();
        let config = PaneConfig::from_js(config)?;
        logging::init(config.level_filter()?);
        let controller = PaneController::new(JsHost::new(bridge), config)?;
        log::info!("xlpane {} session created", env!("CARGO_PKG_VERSION"));
        Ok(Self {
            controller: Rc::new(controller),
        })
    }

    /// Instrument every sheet. Resolves to the number of sheets instrumented,
    /// or `null` if startup failed.
    pub fn start(&self) -> Promise {
        let controller = Rc::clone(&self.controller);
        future_to_promise(async move {
            let count = controller.start().await;
            Ok(count
                .and_then(|n| u32::try_from(n).ok())
                .map_or(JsValue::NULL, JsValue::from))
        })
    }

    /// Feed one host notification. Resolves to `"show"`, `"hide"` or `null`.
    #[wasm_bindgen(js_name = handleEvent)]
    pub fn handle_event(&self, event: JsValue) -> Promise {
        let controller = Rc::clone(&self.controller);
        future_to_promise(async move {
            let event: HostEvent = serde_wasm_bindgen::from_value(event)
                .map_err(|e| XlpaneError::InvalidInput(format!("malformed host event: {e}")))?;
            Ok(action_value(controller.on_host_event(event).await))
        })
    }

    /// Evaluate an address (or the current selection) against the trigger.
    #[wasm_bindgen(js_name = evaluateSelection)]
    pub fn evaluate_selection(&self, address: Option<String>) -> Promise {
        let controller = Rc::clone(&self.controller);
        future_to_promise(async move {
            let action = controller.evaluate_selection(address.as_deref()).await;
            Ok(action_value(action))
        })
    }

    /// Resolves to the updated recent-colors list.
    #[wasm_bindgen(js_name = pushColor)]
    pub fn push_color(&self, value: String) -> Promise {
        let controller = Rc::clone(&self.controller);
        future_to_promise(async move { Ok(string_array(&controller.push_color(&value).await)) })
    }

    #[wasm_bindgen(js_name = getRecentColors)]
    pub fn get_recent_colors(&self) -> Promise {
        let controller = Rc::clone(&self.controller);
        future_to_promise(async move { Ok(string_array(&controller.get_recent_colors().await)) })
    }

    /// `targets` is `{ fill, font, borders }`. Resolves to the updated
    /// recent list, or `null` if nothing was applied.
    #[wasm_bindgen(js_name = applyColor)]
    pub fn apply_color(&self, value: String, targets: JsValue) -> Promise {
        let controller = Rc::clone(&self.controller);
        future_to_promise(async move {
            let targets: ColorTargets = if targets.is_undefined() || targets.is_null() {
                ColorTargets::FILL
            } else {
                serde_wasm_bindgen::from_value(targets)
                    .map_err(|e| XlpaneError::InvalidInput(format!("malformed targets: {e}")))?
            };
            Ok(controller
                .apply_color(&value, targets)
                .await
                .map_or(JsValue::NULL, |list| string_array(&list)))
        })
    }

    /// `source` is `"fill"` or `"font"`. Resolves to `#RRGGBB` or `null`.
    #[wasm_bindgen(js_name = readSelectionColor)]
    pub fn read_selection_color(&self, source: String) -> Promise {
        let controller = Rc::clone(&self.controller);
        future_to_promise(async move {
            let source = match source.as_str() {
                "font" => ColorSource::Font,
                _ => ColorSource::Fill,
            };
            Ok(controller
                .read_selection_color(source)
                .await
                .map_or(JsValue::NULL, |c| JsValue::from_str(&c)))
        })
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&self) -> Promise {
        let controller = Rc::clone(&self.controller);
        future_to_promise(async move {
            Ok(JsValue::from_bool(controller.clear_selection_format().await))
        })
    }

    /// Arm the eyedropper: the next selection's fill joins the recent list.
    #[wasm_bindgen(js_name = sampleNextSelection)]
    pub fn sample_next_selection(&self) {
        self.controller.sample_next_selection();
    }

    #[wasm_bindgen(js_name = showTaskpane)]
    pub fn show_taskpane(&self) -> Promise {
        let controller = Rc::clone(&self.controller);
        future_to_promise(async move { Ok(JsValue::from_bool(controller.show_taskpane().await)) })
    }

    #[wasm_bindgen(js_name = quickFill)]
    pub fn quick_fill(&self) -> Promise {
        let controller = Rc::clone(&self.controller);
        future_to_promise(async move { Ok(JsValue::from_bool(controller.quick_fill().await)) })
    }

    /// `{ openedByTrigger, lastOpenAtMs }`.
    #[wasm_bindgen(js_name = visibilityState)]
    pub fn visibility_state(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.controller.visibility())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
