//! Synchroma - self-organizing display panel firmware
//!
//! Each node boots the same image: it scans for the panel network and
//! joins it as a station, or creates it as the access point when nobody
//! else has. Frames arrive over a small UDP protocol and are rendered
//! with hardware-paced output timing.
//!
//! Boot order is fixed: banner, panel peripheral, network formation,
//! then the main loop. There is no shutdown path.

#![no_std]
#![no_main]

extern crate alloc;

use esp_backtrace as _;
use esp_hal::clock::{Clocks, CpuClock};
use esp_hal::delay::Delay;
use esp_hal::entry;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_wifi::EspWifiController;
use log::info;
use smoltcp::phy::Device;
use static_cell::StaticCell;

use synchroma_core::config::{NetworkConfig, PanelConfig, SyncConfig};
use synchroma_core::formation::{Formation, Role};
use synchroma_core::frame::{FrameId, FrameStore};
use synchroma_core::panel::waveform::{frame_waveform, test_pattern};
use synchroma_core::panel::RefreshPacer;
use synchroma_core::sync::SyncEngine;
use synchroma_core::traits::{Clock as ClockTrait, Diagnostics};

mod diag;
mod net;
mod panel;
mod time;

/// The frame arena is ~30 KB; it lives in static memory, not the stack
static FRAME_STORE: StaticCell<FrameStore> = StaticCell::new();
static WIFI_INIT: StaticCell<EspWifiController<'static>> = StaticCell::new();

/// Interval between link checks in the serve loop, milliseconds
const LINK_CHECK_MS: u32 = 1000;

#[entry]
fn main() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));

    // The WiFi stack allocates from this heap
    esp_alloc::heap_allocator!(size: 96 * 1024);
    esp_println::logger::init_logger_from_env();

    let cpu_hz = Clocks::get().cpu_clock.to_Hz();
    banner(cpu_hz);

    let clock = time::Uptime;
    let mut delay = time::HalDelay(Delay::new());
    let rng = Rng::new(peripherals.RNG);

    let panel_cfg = PanelConfig::default();
    #[cfg(not(feature = "bitbang"))]
    let pins = PanelPins {
        i2s: peripherals.I2S0,
        dma: peripherals.DMA_I2S0,
        data: peripherals.GPIO4,
        clock: peripherals.GPIO5,
    };
    #[cfg(feature = "bitbang")]
    let pins = PanelPins {
        data: peripherals.GPIO4,
        clock: peripherals.GPIO5,
        cpu_hz,
    };
    let mut renderer = build_renderer(pins, &panel_cfg);

    // Visual check that the output path works before the network exists
    renderer.emit(test_pattern(panel_cfg.sample_rate_hz));

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let wifi_init = WIFI_INIT.init(
        esp_wifi::init(timg0.timer0, rng, peripherals.RADIO_CLK).expect("wifi init"),
    );
    let mut platform = net::WifiPlatform::new(wifi_init, peripherals.WIFI, clock, delay);

    let mut formation = Formation::new(NetworkConfig::default());
    let mut sink = diag::LogSink::new();
    let store = &*FRAME_STORE.init(FrameStore::new());

    loop {
        if net::LINK.down.take() {
            formation.notify_link_lost();
        }
        let (role, _addr) = formation.establish(&mut platform, &mut delay, &mut sink);

        let result = match role {
            Role::Station => platform.split_station().map(|(socket, watch)| {
                serve(
                    socket, watch, role, rng, clock, store, &mut renderer, &mut sink, &panel_cfg,
                )
            }),
            Role::AccessPoint => platform.split_access_point().map(|(socket, watch)| {
                serve(
                    socket, watch, role, rng, clock, store, &mut renderer, &mut sink, &panel_cfg,
                )
            }),
        };

        if let Err(err) = result {
            sink_split_failure(&mut formation, &mut sink, err);
        }
    }
}

/// Protocol polling and rendering until the link drops
#[allow(clippy::too_many_arguments)]
fn serve<D: Device>(
    socket: net::NodeSocket<'_, D>,
    mut watch: net::LinkWatch<'_, '_>,
    role: Role,
    rng: Rng,
    clock: time::Uptime,
    store: &FrameStore,
    renderer: &mut Renderer<'_>,
    sink: &mut diag::LogSink,
    panel_cfg: &PanelConfig,
) {
    let mut engine = SyncEngine::new(
        socket,
        clock,
        time::HwJitter(rng),
        time::HalDelay(Delay::new()),
        role,
        SyncConfig::default(),
    );
    let mut refresh = RefreshPacer::new(panel_cfg.refresh_period_ms);
    let mut link_check = RefreshPacer::new(LINK_CHECK_MS);
    let mut current: Option<FrameId> = None;

    loop {
        if let Some(id) = engine.poll(sink) {
            match store.get(id) {
                Ok(frame) => {
                    renderer.emit(frame_waveform(frame));
                    current = Some(id);
                }
                Err(err) => sink.frame_rejected(err),
            }
        }

        let now = clock.now_ms();
        if refresh.due(now) {
            // Simple cadence: re-emit the last frame once per period
            if let Some(id) = current {
                if let Ok(frame) = store.get(id) {
                    renderer.emit(frame_waveform(frame));
                }
            }
        }
        if link_check.due(now) && !watch.link_is_up() {
            info!("link lost; restarting formation");
            return;
        }
    }
}

fn sink_split_failure(
    formation: &mut Formation,
    sink: &mut diag::LogSink,
    err: synchroma_core::traits::NetError,
) {
    sink.formation_failed(err);
    // Tear the cycle down so establish() does not immediately return Up
    formation.notify_link_lost();
}

fn banner(cpu_hz: u32) {
    info!(
        "synchroma node: {} freq {} MHz heap {} free",
        esp_hal::chip!(),
        cpu_hz / 1_000_000,
        esp_alloc::HEAP.free(),
    );
}

// --- Output path selection ---------------------------------------------------
//
// The default path hands waveforms to the DMA-paced I2S peripheral. The
// `bitbang` fallback drives the lines from the CPU inside interrupts-off
// windows; strictly less robust (formation and logging stall during each
// window, and timing rests on the busy-wait calibration), kept for boards
// where the peripheral path is unavailable.

#[cfg(not(feature = "bitbang"))]
struct PanelPins {
    i2s: esp_hal::peripherals::I2S0,
    dma: esp_hal::peripherals::DMA_I2S0,
    data: esp_hal::peripherals::GPIO4,
    clock: esp_hal::peripherals::GPIO5,
}

#[cfg(not(feature = "bitbang"))]
struct Renderer<'d> {
    bus: panel::I2sPanel,
    ring: synchroma_core::panel::DmaRing<{ panel::SLOTS }>,
    _marker: core::marker::PhantomData<&'d ()>,
}

#[cfg(not(feature = "bitbang"))]
fn build_renderer(pins: PanelPins, cfg: &PanelConfig) -> Renderer<'static> {
    use esp_hal::gpio::NoPin;
    use esp_hal::i2s::parallel::{I2sParallel, TxSixteenBits};
    use esp_hal::time::RateExtU32;

    // Word bits 0 and 1 route to the two panel lines through the GPIO
    // matrix; the other lanes and the word clock stay unrouted
    let lanes = TxSixteenBits::new(
        pins.data, pins.clock, NoPin, NoPin, NoPin, NoPin, NoPin, NoPin, NoPin, NoPin, NoPin,
        NoPin, NoPin, NoPin, NoPin, NoPin,
    );
    let parallel = I2sParallel::new(pins.i2s, pins.dma, cfg.sample_rate_hz.Hz(), lanes, NoPin);

    Renderer {
        bus: panel::I2sPanel::new(parallel, cfg),
        ring: synchroma_core::panel::DmaRing::new(),
        _marker: core::marker::PhantomData,
    }
}

#[cfg(not(feature = "bitbang"))]
impl Renderer<'_> {
    fn emit(&mut self, samples: impl Iterator<Item = u16>) {
        synchroma_core::panel::WaveformWriter::new(&mut self.bus, &mut self.ring).write(samples);
    }
}

#[cfg(feature = "bitbang")]
struct PanelPins {
    data: esp_hal::peripherals::GPIO4,
    clock: esp_hal::peripherals::GPIO5,
    cpu_hz: u32,
}

#[cfg(feature = "bitbang")]
struct Renderer<'d> {
    lines: panel::GpioLines<'d>,
    counter: time::CpuCycles,
    region: time::IrqOff,
    cpu_hz: u32,
    period_ns: u32,
}

#[cfg(feature = "bitbang")]
fn build_renderer(pins: PanelPins, cfg: &PanelConfig) -> Renderer<'static> {
    use esp_hal::gpio::{Level, Output};

    Renderer {
        lines: panel::GpioLines::new(
            Output::new(pins.data, Level::Low),
            Output::new(pins.clock, Level::Low),
        ),
        counter: time::CpuCycles,
        region: time::IrqOff,
        cpu_hz: pins.cpu_hz,
        period_ns: 1_000_000_000 / cfg.sample_rate_hz,
    }
}

#[cfg(feature = "bitbang")]
impl Renderer<'_> {
    /// Emit in bounded interrupts-off batches
    fn emit(&mut self, samples: impl Iterator<Item = u16>) {
        use synchroma_core::panel::bitbang::{emit, Edge};

        let mut edges: heapless::Vec<Edge, 512> = heapless::Vec::new();
        for levels in samples {
            let edge = Edge {
                levels,
                hold_ns: self.period_ns,
            };
            if edges.push(edge).is_err() {
                emit(
                    &mut self.lines,
                    &self.counter,
                    &mut self.region,
                    self.cpu_hz,
                    &edges,
                );
                edges.clear();
                let _ = edges.push(edge);
            }
        }
        if !edges.is_empty() {
            emit(
                &mut self.lines,
                &self.counter,
                &mut self.region,
                self.cpu_hz,
                &edges,
            );
        }
    }
}
