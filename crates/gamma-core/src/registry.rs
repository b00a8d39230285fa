//! Adjustment method registry.
//!
//! The registry maps each [`AdjustmentMethod`] to the backend serving it and
//! answers the method-level queries: availability, capabilities, default
//! sites, and which methods to try first.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::backend::AdjustmentBackend;
use crate::capabilities::Capabilities;
use crate::dummy::DummyBackend;
use crate::error::{ErrorKind, GammaError};
use crate::hierarchy::Site;
use crate::method::{AdjustmentMethod, MethodSelector};

/// Preference order used by [`Registry::list`].
const PREFERENCE: [AdjustmentMethod; AdjustmentMethod::COUNT] = [
    AdjustmentMethod::XRandr,
    AdjustmentMethod::XVidMode,
    AdjustmentMethod::LinuxDrm,
    AdjustmentMethod::W32Gdi,
    AdjustmentMethod::QuartzCoreGraphics,
    AdjustmentMethod::Dummy,
];

/// Backends keyed by the method they serve.
#[derive(Default, Clone)]
pub struct Registry {
    backends: BTreeMap<AdjustmentMethod, Arc<dyn AdjustmentBackend>>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the in-process dummy backend with its default
    /// configuration.
    pub fn with_dummy() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DummyBackend::default()));
        registry
    }

    /// Register `backend` for its method, returning the backend it replaces.
    pub fn register(&mut self, backend: Arc<dyn AdjustmentBackend>) -> Option<Arc<dyn AdjustmentBackend>> {
        let method = backend.method();
        debug!("Registering {method} backend");
        self.backends.insert(method, backend)
    }

    pub fn backend(&self, method: AdjustmentMethod) -> Option<&Arc<dyn AdjustmentBackend>> {
        self.backends.get(&method)
    }

    fn require(&self, method: AdjustmentMethod) -> Result<&Arc<dyn AdjustmentBackend>, GammaError> {
        self.backend(method)
            .ok_or(GammaError::Library(ErrorKind::NoSuchAdjustmentMethod))
    }

    /// Methods matching `selector`, best first.
    ///
    /// The "likely working" selectors are a heuristic: they keep real methods
    /// whose default site is known, and skip DRM while an X display is set
    /// and RandR is usable.
    pub fn list(&self, selector: MethodSelector) -> Vec<AdjustmentMethod> {
        let display = env::var("DISPLAY").ok();
        self.list_for_display(selector, display.as_deref())
    }

    fn list_for_display(&self, selector: MethodSelector, display: Option<&str>) -> Vec<AdjustmentMethod> {
        let display_set = display.is_some_and(|value| !value.is_empty());
        let randr_usable = self.is_available(AdjustmentMethod::XRandr);

        PREFERENCE
            .into_iter()
            .filter(|method| self.is_available(*method))
            .filter(|method| {
                let caps = self.backends[method].capabilities();
                match selector {
                    MethodSelector::LikelyWorkingReal | MethodSelector::LikelyWorkingIncludingFake => {
                        if selector == MethodSelector::LikelyWorkingReal && caps.fake {
                            return false;
                        }
                        if *method == AdjustmentMethod::LinuxDrm && randr_usable && display_set {
                            return false;
                        }
                        caps.real && caps.default_site_known
                    }
                    MethodSelector::AllRealNonFake => caps.real && !caps.fake,
                    MethodSelector::AllReal => caps.real,
                    MethodSelector::All => true,
                }
            })
            .collect()
    }

    /// Whether `method` is registered and usable. Never fails.
    pub fn is_available(&self, method: AdjustmentMethod) -> bool {
        self.backend(method).is_some_and(|backend| backend.is_available())
    }

    /// [`Registry::is_available`] for a raw method id; unknown ids are
    /// simply unavailable.
    pub fn is_method_available(&self, raw: i32) -> bool {
        AdjustmentMethod::from_raw(raw).is_some_and(|method| self.is_available(method))
    }

    pub fn capabilities(&self, method: AdjustmentMethod) -> Result<Capabilities, GammaError> {
        Ok(self.require(method)?.capabilities())
    }

    /// Default site for `method`, from the environment.
    pub fn default_site(&self, method: AdjustmentMethod) -> Option<String> {
        self.backend(method)?.default_site()
    }

    /// Environment variable naming the default site for `method`.
    pub fn default_site_variable(&self, method: AdjustmentMethod) -> Option<&'static str> {
        self.backend(method)?.default_site_variable()
    }

    /// Open a site of `method`. `None` selects the default site.
    pub fn open_site(&self, method: AdjustmentMethod, site: Option<&str>) -> Result<Site, GammaError> {
        let backend = Arc::clone(self.require(method)?);
        Site::open(backend, site)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.backends.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::DummyConfig;

    fn dummy_with(configure: impl FnOnce(&mut Capabilities)) -> Arc<DummyBackend> {
        let mut config = DummyConfig::default();
        configure(&mut config.capabilities);
        Arc::new(DummyBackend::new(config))
    }

    /// A dummy backend registered under another method's id.
    fn stand_in(method: AdjustmentMethod, configure: impl FnOnce(&mut Capabilities)) -> Arc<DummyBackend> {
        let mut config = DummyConfig::default();
        config.method = method;
        configure(&mut config.capabilities);
        Arc::new(DummyBackend::new(config))
    }

    #[test]
    fn test_unknown_method_is_unavailable() {
        let registry = Registry::with_dummy();
        assert!(registry.is_method_available(0));
        assert!(!registry.is_method_available(-1));
        assert!(!registry.is_method_available(1000));
        assert!(!registry.is_available(AdjustmentMethod::XRandr));
    }

    #[test]
    fn test_unregistered_method_queries() {
        let registry = Registry::new();
        assert_eq!(
            registry.capabilities(AdjustmentMethod::LinuxDrm),
            Err(GammaError::Library(ErrorKind::NoSuchAdjustmentMethod))
        );
        assert_eq!(registry.default_site(AdjustmentMethod::LinuxDrm), None);
        assert!(registry.open_site(AdjustmentMethod::LinuxDrm, None).is_err());
    }

    #[test]
    fn test_dummy_is_listed_only_by_all() {
        let registry = Registry::with_dummy();
        assert_eq!(registry.list(MethodSelector::All), vec![AdjustmentMethod::Dummy]);
        assert!(registry.list(MethodSelector::AllReal).is_empty());
        assert!(registry.list(MethodSelector::LikelyWorkingReal).is_empty());
    }

    #[test]
    fn test_list_orders_by_preference() {
        let mut registry = Registry::new();
        registry.register(dummy_with(|caps| caps.real = true));
        registry.register(stand_in(AdjustmentMethod::LinuxDrm, |caps| caps.real = true));
        registry.register(stand_in(AdjustmentMethod::XRandr, |caps| caps.real = true));
        assert_eq!(
            registry.list(MethodSelector::AllReal),
            vec![
                AdjustmentMethod::XRandr,
                AdjustmentMethod::LinuxDrm,
                AdjustmentMethod::Dummy
            ]
        );
    }

    #[test]
    fn test_likely_working_filters() {
        let mut registry = Registry::new();
        registry.register(stand_in(AdjustmentMethod::XRandr, |caps| {
            caps.real = true;
            caps.default_site_known = true;
        }));
        registry.register(stand_in(AdjustmentMethod::LinuxDrm, |caps| {
            caps.real = true;
            caps.default_site_known = true;
        }));
        registry.register(stand_in(AdjustmentMethod::W32Gdi, |caps| {
            caps.real = true;
            caps.fake = true;
            caps.default_site_known = true;
        }));
        registry.register(stand_in(AdjustmentMethod::XVidMode, |caps| caps.real = true));

        assert_eq!(
            registry.list_for_display(MethodSelector::LikelyWorkingReal, Some(":0")),
            vec![AdjustmentMethod::XRandr]
        );
        assert_eq!(
            registry.list_for_display(MethodSelector::LikelyWorkingIncludingFake, None),
            vec![
                AdjustmentMethod::XRandr,
                AdjustmentMethod::LinuxDrm,
                AdjustmentMethod::W32Gdi
            ]
        );
        assert_eq!(
            registry.list_for_display(MethodSelector::AllRealNonFake, Some(":0")),
            vec![
                AdjustmentMethod::XRandr,
                AdjustmentMethod::XVidMode,
                AdjustmentMethod::LinuxDrm
            ]
        );
    }
}
