//! I2S parallel panel backend
//!
//! The ESP32's I2S peripheral in LCD mode emits 16-bit words in parallel
//! at a fixed rate; routing word bits 0 and 1 through the GPIO matrix to
//! the panel pins turns the sample stream into hardware-paced output
//! lines. This backend owns the DMA buffers, one per ring slot, and
//! chains one-shot transfers in slot order; the core's ring mirror
//! decides which slot may be written, this side only reports completion.

use core::cell::RefCell;
use core::mem;

use esp_hal::dma::DmaTxBuf;
use esp_hal::i2s::parallel::{I2sParallel, I2sParallelTransfer};
use esp_hal::Blocking;
use heapless::Deque;
use log::error;

use synchroma_core::config::PanelConfig;
use synchroma_core::traits::PanelBus;

/// Ring depth, fixed by the two statically allocated DMA buffers
pub const SLOTS: usize = 2;
/// Samples per DMA buffer
pub const SLOT_SAMPLES: usize = 1024;
const SLOT_BYTES: usize = SLOT_SAMPLES * 2;

enum Engine {
    Idle(I2sParallel<'static, Blocking>),
    Running {
        slot: usize,
        transfer: I2sParallelTransfer<'static, DmaTxBuf, Blocking>,
    },
    // Transient while ownership moves through send()
    Handoff,
}

struct Inner {
    engine: Engine,
    buffers: [Option<DmaTxBuf>; SLOTS],
    queue: Deque<usize, SLOTS>,
    completed: usize,
}

impl Inner {
    /// Retire a finished transfer and start the next queued slot
    fn pump(&mut self) {
        if matches!(&self.engine, Engine::Running { transfer, .. } if transfer.is_done()) {
            if let Engine::Running { slot, transfer } =
                mem::replace(&mut self.engine, Engine::Handoff)
            {
                let (parallel, buffer) = transfer.wait();
                self.buffers[slot] = Some(buffer);
                self.completed = slot;
                self.engine = Engine::Idle(parallel);
            }
        }

        if !matches!(self.engine, Engine::Idle(_)) {
            return;
        }
        let Some(slot) = self.queue.pop_front() else {
            return;
        };

        let buffer = self.buffers[slot].take().expect("queued slot has a buffer");
        if let Engine::Idle(parallel) = mem::replace(&mut self.engine, Engine::Handoff) {
            match parallel.send(buffer) {
                Ok(transfer) => self.engine = Engine::Running { slot, transfer },
                Err((err, parallel, buffer)) => {
                    // A transfer that cannot start with a valid buffer
                    // violates the hardware contract
                    error!("i2s dma start failed: {:?}", err);
                    self.buffers[slot] = Some(buffer);
                    self.engine = Engine::Idle(parallel);
                    panic!("i2s dma start failed");
                }
            }
        }
    }
}

/// [`PanelBus`] over the I2S LCD-mode peripheral
pub struct I2sPanel {
    inner: RefCell<Inner>,
}

impl I2sPanel {
    /// Takes the configured parallel peripheral. `cfg` must match the
    /// static buffer geometry.
    pub fn new(parallel: I2sParallel<'static, Blocking>, cfg: &PanelConfig) -> Self {
        assert_eq!(cfg.dma_buffers, SLOTS);
        assert_eq!(cfg.dma_buffer_len, SLOT_SAMPLES);

        let (_, _, buf_a, desc_a) = esp_hal::dma_buffers!(0, SLOT_BYTES);
        let (_, _, buf_b, desc_b) = esp_hal::dma_buffers!(0, SLOT_BYTES);
        let buffers = [
            Some(DmaTxBuf::new(desc_a, buf_a).expect("dma buffer a")),
            Some(DmaTxBuf::new(desc_b, buf_b).expect("dma buffer b")),
        ];

        Self {
            inner: RefCell::new(Inner {
                engine: Engine::Idle(parallel),
                buffers,
                queue: Deque::new(),
                completed: SLOTS - 1,
            }),
        }
    }
}

impl PanelBus for I2sPanel {
    fn buffer_count(&self) -> usize {
        SLOTS
    }

    fn buffer_len(&self) -> usize {
        SLOT_SAMPLES
    }

    fn completed_marker(&self) -> usize {
        let mut inner = self.inner.borrow_mut();
        inner.pump();
        inner.completed
    }

    fn fill(&mut self, slot: usize, samples: &[u16]) {
        let inner = self.inner.get_mut();
        assert_eq!(samples.len(), SLOT_SAMPLES);

        let buffer = inner.buffers[slot].as_mut().expect("free slot has its buffer");
        let bytes = buffer.as_mut_slice();
        // The buffer is concurrently visible to the DMA engine; keep the
        // stores un-elidable
        for (i, &sample) in samples.iter().enumerate() {
            let [lo, hi] = sample.to_le_bytes();
            unsafe {
                bytes.as_mut_ptr().add(2 * i).write_volatile(lo);
                bytes.as_mut_ptr().add(2 * i + 1).write_volatile(hi);
            }
        }

        // Capacity equals the slot count, so the push cannot fail while
        // the ring contract holds
        let _ = inner.queue.push_back(slot);
        inner.pump();
    }
}

/// Direct GPIO control of the two output lines, for the bit-banged
/// fallback path
#[cfg(feature = "bitbang")]
pub struct GpioLines<'d> {
    data: esp_hal::gpio::Output<'d>,
    clock: esp_hal::gpio::Output<'d>,
}

#[cfg(feature = "bitbang")]
impl<'d> GpioLines<'d> {
    pub fn new(data: esp_hal::gpio::Output<'d>, clock: esp_hal::gpio::Output<'d>) -> Self {
        Self { data, clock }
    }
}

#[cfg(feature = "bitbang")]
impl synchroma_core::traits::LineOutput for GpioLines<'_> {
    fn set_levels(&mut self, levels: u16) {
        use synchroma_core::panel::waveform::{LINE_CLOCK, LINE_DATA};

        self.data.set_level((levels & LINE_DATA != 0).into());
        self.clock.set_level((levels & LINE_CLOCK != 0).into());
    }
}
