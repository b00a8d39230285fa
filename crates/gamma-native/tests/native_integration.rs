use gamma_core::{AdjustmentMethod, MethodSelector, Registry};
use gamma_native::{NativeBackend, NativeLibrary, register_available};

/// Load the system libgamma. Returns `None` when it is not installed, so the
/// tests below pass vacuously on machines without it.
fn load_library() -> Option<&'static NativeLibrary> {
    NativeLibrary::load().ok()
}

#[test]
fn test_registered_methods_are_available() {
    let Some(library) = load_library() else {
        return;
    };
    let mut registry = Registry::with_dummy();
    let count = register_available(&mut registry).expect("library already loaded");

    let all = registry.list(MethodSelector::All);
    assert_eq!(all.len(), count + 1, "registered methods plus the dummy");
    assert_eq!(all.last(), Some(&AdjustmentMethod::Dummy));
    for method in all {
        if method == AdjustmentMethod::Dummy {
            continue;
        }
        assert!(library.is_method_available(method.value()));
        assert!(registry.is_available(method));
    }
}

#[test]
fn test_real_methods_report_real_capability() {
    let Some(library) = load_library() else {
        return;
    };
    for &method in AdjustmentMethod::all() {
        if method == AdjustmentMethod::Dummy || !library.is_method_available(method.value()) {
            continue;
        }
        let backend = NativeBackend::with_library(library, method);
        let caps = gamma_core::AdjustmentBackend::capabilities(&backend);
        assert!(caps.real, "{method} should talk to a real display system");
    }
}

#[test]
fn test_unknown_method_id_is_unavailable() {
    let Some(library) = load_library() else {
        return;
    };
    assert!(!library.is_method_available(-1));
    assert!(!library.is_method_available(1000));
}

#[test]
fn test_unknown_site_fails_cleanly() {
    let Some(library) = load_library() else {
        return;
    };
    for &method in AdjustmentMethod::all() {
        if method == AdjustmentMethod::Dummy || !library.is_method_available(method.value()) {
            continue;
        }
        let backend = std::sync::Arc::new(NativeBackend::with_library(library, method));
        // The rejected name is released on every failed attempt.
        for _ in 0..3 {
            let result = gamma_core::Site::open(backend.clone(), Some(":9999"));
            if let Ok(site) = result {
                assert_eq!(site.name(), Some(":9999"));
            }
        }
    }
}
