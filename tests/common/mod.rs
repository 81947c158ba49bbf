#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Condvar, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use hifitime::Epoch;
use nalgebra::Vector3;
use tokio::sync::Notify;
use umbra::{
    catalog::{fetcher::CatalogFetcher, sources::SourceDescriptor},
    config::EphemerisSettings,
    constants::{Kilometer, Radian},
    ephemeris::{analytic::AnalyticEphemeris, Body, Ephemeris, EphemerisCapability},
    Engine, EngineConfig, EngineError, Prediction,
};

pub const DECADE_2021: &str = r#"<html><body>
<table class="decade">
<tr><th>Calendar Date</th><th>TD of Greatest Eclipse</th><th>Eclipse Type</th><th>Saros</th>
    <th>Eclipse Magnitude</th><th>Central Duration</th><th>Geographic Region of Eclipse Visibility</th></tr>
<tr><td>2026 Aug 12</td><td>17:47:06</td><td>Total</td><td>126</td><td>1.0386</td><td>02m18s</td>
    <td>n N. America, w Africa, Europe<br>[Total: Arctic, Greenland, Iceland, Spain]</td></tr>
<tr><td>2027 Aug 02</td><td>10:07:50</td><td>Total</td><td>136</td><td>1.0790</td><td>06m23s</td>
    <td>Africa, Europe, Mid East, w &amp; s Asia<br>[Total: Morocco, Spain, Algeria, Libya, Egypt]</td></tr>
<tr><td>2028 Jul 22</td><td>02:56:40</td><td>Total</td><td>146</td><td>1.0560</td><td>05m10s</td>
    <td>SE Asia, E. Indies, Australia, New Zealand<br>[Total: Australia, New Zealand]</td></tr>
<tr><td>2030 Jun 01</td><td>06:29:13</td><td>Annular</td><td>128</td><td>0.9443</td><td>05m21s</td>
    <td>Europe, n Africa, Mid East, Asia, Arctic, Alaska</td></tr>
<tr><td>2030 Nov 25</td><td>06:51:37</td><td>Total</td><td>133</td><td>1.0468</td><td>03m44s</td>
    <td>s Africa, s Indian Ocean, Australia, Antarctica</td></tr>
</table>
</body></html>"#;

pub const DECADE_2031: &str = r#"<table>
<tr><td>2035 Sep 02</td><td>01:56:46</td><td>Total</td><td>145</td><td>1.0320</td><td>02m54s</td>
    <td>e Asia, Pacific<br>[Total: China, Korea, Japan]</td></tr>
</table>"#;

pub const REGION_INDEX: &str = r#"<html><body><h2>Solar Eclipses by Region</h2>
<ul>
  <li><a href="JSEX-EU.html">Europe</a></li>
  <li><a href="JSEX-AS.html">Asia and Asia Minor</a></li>
  <li><a href="../help.html">Help</a></li>
</ul></body></html>"#;

pub const REGION_EUROPE: &str = "<pre>\
Date          Type      Notes\n\
2027 Aug 02   Total     deep partial phase in southern Europe\n\
26 Jan 2028   Annular   partial at sunset\n\
</pre>";

pub const REGION_ASIA: &str = "<pre>\
2028 Jul 22   Total\n\
2035 Sep 02   Total\n\
</pre>";

/// The instant the tests consider "now".
pub fn test_now() -> Epoch {
    Epoch::from_gregorian_utc_hms(2026, 10, 16, 0, 0, 0)
}

/// Serves the fixture documents by file name and counts the requests.
pub struct FixtureFetcher {
    documents: HashMap<String, String>,
    calls: AtomicUsize,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        let documents = [
            ("SEdecade2021.html", DECADE_2021),
            ("SEdecade2031.html", DECADE_2031),
            ("JSEX-index.html", REGION_INDEX),
            ("JSEX-EU.html", REGION_EUROPE),
            ("JSEX-AS.html", REGION_ASIA),
        ]
        .into_iter()
        .map(|(name, body)| (name.to_string(), body.to_string()))
        .collect();
        FixtureFetcher {
            documents,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every request fails.
    pub fn offline() -> Self {
        FixtureFetcher {
            documents: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Same documents, `name` replaced by `body`.
    pub fn with_document(mut self, name: &str, body: &str) -> Self {
        self.documents.insert(name.to_string(), body.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogFetcher for FixtureFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<String, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = source.url.rsplit('/').next().unwrap_or_default();
        self.documents
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::Fetch {
                source_id: source.id.clone(),
                cause: "HTTP 404 Not Found".into(),
            })
    }
}

/// Decade tables only, or decade tables and regional listings.
pub fn fixture_config(with_regions: bool) -> EngineConfig {
    EngineConfig {
        decade_urls: vec![
            "https://fixtures.test/SEdecade2021.html".into(),
            "https://fixtures.test/SEdecade2031.html".into(),
        ],
        region_index_url: with_regions.then(|| "https://fixtures.test/JSEX-index.html".into()),
        retry_backoff: Duration::ZERO,
        concurrency: 2,
        ephemeris: EphemerisSettings {
            enabled: false,
            ..EphemerisSettings::default()
        },
        ..EngineConfig::default()
    }
}

pub fn analytic_capability() -> EphemerisCapability {
    EphemerisCapability::from_provider(Arc::new(AnalyticEphemeris::new(None)))
}

pub fn fixture_engine(fetcher: Arc<FixtureFetcher>, with_regions: bool) -> Engine {
    Engine::with_components(fixture_config(with_regions), fetcher, analytic_capability())
        .unwrap()
        .with_clock(test_now)
}

/// Analytic positions, held back for instants around the 2028 Jul 22 eclipse until opened.
///
/// Positions are queried from the blocking pool, so a closed gate parks that computation while
/// the later records of a scan go on.
#[derive(Debug)]
pub struct GatedEphemeris {
    inner: AnalyticEphemeris,
    from: Epoch,
    to: Epoch,
    open: Mutex<bool>,
    opened: Condvar,
    entered: Notify,
    passed: Notify,
}

impl GatedEphemeris {
    pub fn closed() -> Arc<Self> {
        Arc::new(GatedEphemeris {
            inner: AnalyticEphemeris::new(None),
            from: Epoch::from_gregorian_utc_hms(2028, 7, 21, 12, 0, 0),
            to: Epoch::from_gregorian_utc_hms(2028, 7, 23, 0, 0, 0),
            open: Mutex::new(false),
            opened: Condvar::new(),
            entered: Notify::new(),
            passed: Notify::new(),
        })
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }

    /// Resolves once a computation is parked at the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Resolves once a computation of a later eclipse has started.
    pub async fn wait_passed(&self) {
        self.passed.notified().await;
    }
}

impl Ephemeris for GatedEphemeris {
    fn name(&self) -> &str {
        "gated"
    }

    fn data_version(&self) -> String {
        self.inner.data_version()
    }

    fn position(&self, body: Body, epoch: &Epoch) -> Vector3<Kilometer> {
        if *epoch > self.to {
            self.passed.notify_one();
        } else if *epoch >= self.from {
            self.entered.notify_one();
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.opened.wait(open).unwrap();
            }
        }
        self.inner.position(body, epoch)
    }

    fn apparent_sidereal_time(&self, epoch: &Epoch) -> Radian {
        self.inner.apparent_sidereal_time(epoch)
    }
}

/// Decade tables only, with visibility computed through `gate`.
pub fn gated_engine(fetcher: Arc<FixtureFetcher>, gate: Arc<GatedEphemeris>) -> Engine {
    Engine::with_components(
        fixture_config(false),
        fetcher,
        EphemerisCapability::from_provider(gate),
    )
    .unwrap()
    .with_clock(test_now)
}

pub fn dates(events: &[Prediction]) -> Vec<String> {
    events
        .iter()
        .map(|event| event.record.date_utc.to_string())
        .collect()
}
