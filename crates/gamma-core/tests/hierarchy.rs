use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gamma_core::{
    AdjustmentBackend, AdjustmentMethod, CrtcFields, CrtcInformation, DummyBackend, DummyConfig,
    ErrorKind, GammaError, GammaRampSet, RampBuffer, RampEncoding, Registry, Site, behex, edid,
};

fn dummy(configure: impl FnOnce(&mut DummyConfig)) -> Arc<DummyBackend> {
    let mut config = DummyConfig::default();
    configure(&mut config);
    Arc::new(DummyBackend::new(config))
}

#[test]
fn test_halved_ramps_round_trip() {
    let registry = Registry::with_dummy();
    let site = registry
        .open_site(AdjustmentMethod::Dummy, None)
        .expect("dummy site should open");
    assert_eq!(site.partitions_available(), 1);
    let partition = site.partition(0).expect("partition 0 should open");
    assert_eq!(partition.crtcs_available(), 1);
    let crtc = partition.crtc(0).expect("CRTC 0 should open");

    let info = crtc.information(CrtcFields::RAMP).unwrap();
    assert_eq!(info.gamma_size_error, None);
    assert_eq!(info.encoding(), Some(RampEncoding::U16));

    let mut ramps = crtc.read_ramps(RampEncoding::U16).unwrap();
    let original = ramps.clone();
    for mut channel in ramps.channels_mut() {
        for stop in channel.as_mut_slice::<u16>().unwrap() {
            *stop /= 2;
        }
    }
    crtc.set_gamma(&ramps).unwrap();

    let read_back = crtc.read_ramps(RampEncoding::U16).unwrap();
    assert_eq!(read_back, ramps, "ramps written should read back unchanged");

    crtc.restore().unwrap();
    assert_eq!(crtc.read_ramps(RampEncoding::U16).unwrap(), original);
}

#[test]
fn test_ramps_read_in_any_encoding() {
    let site = Site::open(dummy(|_| {}), None).unwrap();
    let partition = site.partition(0).unwrap();
    let crtc = partition.crtc(0).unwrap();

    let ramps = crtc.read_ramps(RampEncoding::F64).unwrap();
    let red = ramps.red().as_slice::<f64>().unwrap();
    assert_eq!(red.len(), 256);
    assert_eq!(red[0], 0.0);
    assert_eq!(red[255], 1.0);
}

#[test]
fn test_gamma_size_only_query() {
    let backend = dummy(|config| {
        let crtc = &mut config.sites[0].partitions[0].crtcs[0];
        crtc.red_gamma_size = 1024;
        crtc.green_gamma_size = 512;
        crtc.blue_gamma_size = 256;
        crtc.connector_name = Some("DP-1".to_string());
    });
    let site = Site::open(backend, None).unwrap();
    let partition = site.partition(0).unwrap();
    let crtc = partition.crtc(0).unwrap();

    let info = crtc.information(CrtcFields::GAMMA_SIZE).unwrap();
    assert_eq!(
        info,
        CrtcInformation {
            red_gamma_size: 1024,
            green_gamma_size: 512,
            blue_gamma_size: 256,
            ..Default::default()
        }
    );
}

#[test]
fn test_empty_query_yields_defaults() {
    let site = Site::open(dummy(|_| {}), None).unwrap();
    let partition = site.partition(0).unwrap();
    let crtc = partition.crtc(0).unwrap();

    let info = crtc.information(CrtcFields::NONE).unwrap();
    assert_eq!(info, CrtcInformation::default());
}

#[test]
fn test_single_field_queries_are_isolated() {
    let backend = dummy(|config| {
        let crtc = &mut config.sites[0].partitions[0].crtcs[0];
        crtc.edid = Some(behex(&edid::synthesize(60, 34, 120)));
        crtc.width_mm = 600;
        crtc.height_mm = 340;
        crtc.connector_name = Some("HDMI-1".to_string());
    });
    let site = Site::open(backend.clone(), None).unwrap();
    let partition = site.partition(0).unwrap();
    let crtc = partition.crtc(0).unwrap();

    for field in CrtcFields::singles() {
        let direct = backend.crtc_information(crtc.id(), field).unwrap();
        let info = crtc.information(field).unwrap();
        assert_eq!(info, direct, "querying {field} through the CRTC handle");

        let mut rest = info.clone();
        rest.retain(!field);
        assert_eq!(
            rest,
            CrtcInformation::default(),
            "querying {field} touched other fields"
        );
        assert!(
            (info.failed_fields() & !field).is_empty(),
            "querying {field} reported errors for {}",
            info.failed_fields()
        );
    }
}

#[test]
fn test_unsupported_restore() {
    let backend = dummy(|config| {
        config.capabilities.site_restore = false;
        config.capabilities.crtc_restore = false;
    });
    let site = Site::open(backend, None).unwrap();
    assert_eq!(
        site.restore(),
        Err(GammaError::Unsupported {
            method: AdjustmentMethod::Dummy,
            operation: "site restore",
        })
    );
    let partition = site.partition(0).unwrap();
    assert_eq!(partition.restore(), Ok(()));
    let crtc = partition.crtc(0).unwrap();
    assert!(matches!(crtc.restore(), Err(GammaError::Unsupported { .. })));
}

#[test]
fn test_out_of_range_indices() {
    let site = Site::open(dummy(|_| {}), None).unwrap();
    assert_eq!(
        site.partition(1).unwrap_err(),
        GammaError::Library(ErrorKind::NoSuchPartition)
    );
    let partition = site.partition(0).unwrap();
    assert_eq!(
        partition.crtc(3).unwrap_err(),
        GammaError::Library(ErrorKind::NoSuchCrtc)
    );
}

#[test]
fn test_wrong_ramp_size_is_rejected() {
    let site = Site::open(dummy(|_| {}), None).unwrap();
    let partition = site.partition(0).unwrap();
    let crtc = partition.crtc(0).unwrap();

    let ramps = GammaRampSet::new(128, 128, 128, RampEncoding::U8);
    assert_eq!(
        crtc.set_gamma(&ramps),
        Err(GammaError::Library(ErrorKind::WrongGammaRampSize))
    );
}

#[test]
fn test_mixed_sizes_rejected_when_identical_required() {
    let backend = dummy(|config| {
        config.capabilities.identical_gamma_sizes = true;
    });
    let site = Site::open(backend, None).unwrap();
    let partition = site.partition(0).unwrap();
    let crtc = partition.crtc(0).unwrap();

    let ramps = GammaRampSet::new(256, 256, 128, RampEncoding::U16);
    assert_eq!(
        crtc.set_gamma(&ramps),
        Err(GammaError::Library(ErrorKind::MixedGammaRampSize))
    );
}

#[test]
fn test_mixed_encodings_never_reach_backend() {
    let backend = dummy(|_| {});
    let site = Site::open(backend.clone(), None).unwrap();
    let partition = site.partition(0).unwrap();
    let crtc = partition.crtc(0).unwrap();

    let mixed = GammaRampSet::from_buffers(
        RampBuffer::new(RampEncoding::U16, 256),
        RampBuffer::new(RampEncoding::F32, 256),
        RampBuffer::new(RampEncoding::U16, 256),
    );
    assert!(matches!(mixed, Err(GammaError::InvalidArgument(_))));
    assert!(matches!(
        GammaRampSet::with_depth(256, 256, 256, 12),
        Err(GammaError::InvalidArgument(_))
    ));

    let mut ramps = GammaRampSet::new(256, 256, 256, RampEncoding::U16);
    ramps.green_mut().fill_identity();
    crtc.set_gamma(&ramps).unwrap();
    let read_back = crtc.read_ramps(RampEncoding::U16).unwrap();
    assert_eq!(read_back.green(), ramps.green());
    assert_eq!(backend.open_handles(), 3);
}

#[test]
fn test_handles_close_on_drop() {
    let backend = dummy(|_| {});
    {
        let site = Site::open(backend.clone(), None).unwrap();
        let partition = site.partition(0).unwrap();
        let _crtc = partition.crtc(0).unwrap();
        assert_eq!(backend.open_handles(), 3);
    }
    assert_eq!(backend.open_handles(), 0);
}

/// Counts `WARN` events emitted while it is the default subscriber.
struct WarningCounter(Arc<AtomicUsize>);

impl tracing::Subscriber for WarningCounter {
    fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
        tracing::span::Id::from_u64(1)
    }

    fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}

    fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}

    fn event(&self, event: &tracing::Event<'_>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn enter(&self, _: &tracing::span::Id) {}

    fn exit(&self, _: &tracing::span::Id) {}
}

#[test]
fn test_failed_site_open_warns_once() {
    let warnings = Arc::new(AtomicUsize::new(0));
    let backend = dummy(|_| {});
    let result = tracing::subscriber::with_default(WarningCounter(warnings.clone()), || {
        Site::open(backend.clone(), Some("no-such-site"))
    });
    assert_eq!(result.unwrap_err(), GammaError::Library(ErrorKind::NoSuchSite));
    assert_eq!(warnings.load(Ordering::SeqCst), 1);
    assert_eq!(backend.open_handles(), 0);
}
