//! Confirmation UI configuration and the runtime-safety merge described in
//! `spec.md` §4.3 step 2. New relative to the teacher: config merging across
//! {per-request override, user preferences, runtime safety rules} happens in
//! TS UI glue in the source system, out of scope there. Named and shaped
//! the way the teacher's own `config.rs` modules hold policy constants.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UiMode {
    Skip,
    Modal,
    Drawer,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Behavior {
    RequireClick,
    AutoProceed,
    SkipClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    Dark,
    Light,
}

/// Fully resolved confirmation UI policy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationConfig {
    pub ui_mode: UiMode,
    pub behavior: Behavior,
    pub auto_proceed_delay_ms: u32,
    pub theme: Theme,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            ui_mode: UiMode::Modal,
            behavior: Behavior::RequireClick,
            auto_proceed_delay_ms: 0,
            theme: Theme::Dark,
        }
    }
}

/// A partial override, as carried on the request envelope or a host's
/// stored user preferences. `None` fields inherit from the next-lower
/// precedence source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationConfigOverride {
    pub ui_mode: Option<UiMode>,
    pub behavior: Option<Behavior>,
    pub auto_proceed_delay_ms: Option<u32>,
    pub theme: Option<Theme>,
}

impl ConfirmationConfigOverride {
    fn apply_onto(self, base: ConfirmationConfig) -> ConfirmationConfig {
        ConfirmationConfig {
            ui_mode: self.ui_mode.unwrap_or(base.ui_mode),
            behavior: self.behavior.unwrap_or(base.behavior),
            auto_proceed_delay_ms: self.auto_proceed_delay_ms.unwrap_or(base.auto_proceed_delay_ms),
            theme: self.theme.unwrap_or(base.theme),
        }
    }
}

/// Environmental facts the orchestrator uses to clamp a resolved config
/// regardless of what the request/preferences asked for. Populated by the
/// host; this crate never inspects a user agent string itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeSafetyRules {
    /// No user-activation gesture is currently available (e.g. iOS/Safari
    /// background tab) — `skip` cannot reliably auto-proceed there.
    pub lacks_user_activation: bool,
    /// Request originates from a cross-origin wallet iframe doing
    /// registration or device-link.
    pub wallet_iframe_cross_origin_registration: bool,
}

/// Merge precedence, highest first: per-request override, user preferences,
/// runtime safety rules, then the hardcoded default. Runtime safety rules
/// are clamps, not just another override layer: they can only make the UI
/// more conservative, never less.
pub fn resolve_confirmation_config(
    per_request: Option<ConfirmationConfigOverride>,
    user_preferences: Option<ConfirmationConfigOverride>,
    rules: RuntimeSafetyRules,
) -> ConfirmationConfig {
    let mut resolved = ConfirmationConfig::default();
    if let Some(prefs) = user_preferences {
        resolved = prefs.apply_onto(resolved);
    }
    if let Some(req) = per_request {
        resolved = req.apply_onto(resolved);
    }

    if rules.lacks_user_activation && resolved.ui_mode == UiMode::Skip {
        resolved.ui_mode = UiMode::Drawer;
    }
    if rules.lacks_user_activation && resolved.behavior == Behavior::AutoProceed {
        resolved.behavior = Behavior::RequireClick;
    }

    if rules.wallet_iframe_cross_origin_registration {
        let explicitly_opted_skip_or_auto = per_request
            .map(|r| r.ui_mode == Some(UiMode::Skip) || r.behavior == Some(Behavior::AutoProceed))
            .unwrap_or(false);
        if !explicitly_opted_skip_or_auto {
            resolved.ui_mode = UiMode::Modal;
            resolved.behavior = Behavior::RequireClick;
        }
    }

    resolved
}

/// `decryptPrivateKeyWithPrf` always forces silent collection: the
/// credential is gathered without a visible UI step, and any follow-up
/// display is a separate `showSecurePrivateKeyUi` request.
pub fn force_silent_for_decrypt(mut config: ConfirmationConfig) -> ConfirmationConfig {
    config.ui_mode = UiMode::Skip;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_modal_require_click() {
        let resolved = resolve_confirmation_config(None, None, RuntimeSafetyRules::default());
        assert_eq!(resolved.ui_mode, UiMode::Modal);
        assert_eq!(resolved.behavior, Behavior::RequireClick);
    }

    #[test]
    fn per_request_overrides_user_preferences() {
        let prefs = ConfirmationConfigOverride { ui_mode: Some(UiMode::Drawer), ..Default::default() };
        let req = ConfirmationConfigOverride { ui_mode: Some(UiMode::Skip), ..Default::default() };
        let resolved =
            resolve_confirmation_config(Some(req), Some(prefs), RuntimeSafetyRules::default());
        assert_eq!(resolved.ui_mode, UiMode::Skip);
    }

    #[test]
    fn lacking_user_activation_clamps_skip_to_drawer() {
        let req = ConfirmationConfigOverride { ui_mode: Some(UiMode::Skip), ..Default::default() };
        let rules = RuntimeSafetyRules { lacks_user_activation: true, ..Default::default() };
        let resolved = resolve_confirmation_config(Some(req), None, rules);
        assert_eq!(resolved.ui_mode, UiMode::Drawer);
    }

    #[test]
    fn lacking_user_activation_clamps_auto_proceed_to_require_click() {
        let req = ConfirmationConfigOverride { behavior: Some(Behavior::AutoProceed), ..Default::default() };
        let rules = RuntimeSafetyRules { lacks_user_activation: true, ..Default::default() };
        let resolved = resolve_confirmation_config(Some(req), None, rules);
        assert_eq!(resolved.behavior, Behavior::RequireClick);
    }

    #[test]
    fn wallet_iframe_registration_forces_modal_unless_explicit_opt_in() {
        let rules = RuntimeSafetyRules {
            wallet_iframe_cross_origin_registration: true,
            ..Default::default()
        };
        let resolved = resolve_confirmation_config(None, None, rules);
        assert_eq!(resolved.ui_mode, UiMode::Modal);
        assert_eq!(resolved.behavior, Behavior::RequireClick);
    }

    #[test]
    fn wallet_iframe_registration_respects_explicit_skip_opt_in() {
        let req = ConfirmationConfigOverride { ui_mode: Some(UiMode::Skip), ..Default::default() };
        let rules = RuntimeSafetyRules {
            wallet_iframe_cross_origin_registration: true,
            ..Default::default()
        };
        let resolved = resolve_confirmation_config(Some(req), None, rules);
        assert_eq!(resolved.ui_mode, UiMode::Skip);
    }

    #[test]
    fn decrypt_forces_silent() {
        let base = ConfirmationConfig { ui_mode: UiMode::Modal, ..ConfirmationConfig::default() };
        assert_eq!(force_silent_for_decrypt(base).ui_mode, UiMode::Skip);
    }
}
