//! flashcfg example firmware
//!
//! Boots an RP2040, brings up the configuration store in the flash
//! config partition, reads the device settings (writing defaults on first
//! boot), counts boots, and dumps the stored file over defmt.

#![no_std]
#![no_main]

extern crate alloc;

use defmt::*;
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use embedded_alloc::LlffHeap as Heap;
use {defmt_rtt as _, panic_probe as _};

use flashcfg_core::{ConfigStore, StoreOptions};
use flashcfg_hal_rp2040::flash;

use crate::settings::Settings;
use crate::sink::DefmtLines;

mod settings;
mod sink;

// Heap allocator for the JSON document
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 32KB
const HEAP_SIZE: usize = 32 * 1024;

/// Backing file for the configuration document
const CONFIG_PATH: &str = "/config.json";

/// Interval between heartbeat log lines
const HEARTBEAT: Duration = Duration::from_secs(10);

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("flashcfg firmware starting...");

    // Initialize heap allocator
    init_heap();

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let fs = flash::filesystem(p.FLASH, p.DMA_CH0);
    let mut store = ConfigStore::with_options(fs, CONFIG_PATH, StoreOptions::default());

    if let Err(e) = store.initialize() {
        // Keep running on defaults; they are retried on every write
        error!("Config store unavailable: {}", e);
    }

    let settings = Settings::load(&mut store);
    settings.log();

    let mut lines = DefmtLines::new();
    if store.debug_dump(&mut lines).is_err() {
        warn!("Config dump truncated");
    }
    lines.flush();

    if !store.is_synced() {
        warn!("Configuration in RAM differs from flash");
    }

    loop {
        Timer::after(HEARTBEAT).await;
        info!("alive, boot #{}", settings.boot_count);
    }
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
