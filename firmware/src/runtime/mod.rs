use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use static_cell::StaticCell;

use crate::script::{self, MainScript};
use crate::usb;
use macro_core::runner::MacroRunner;
use macro_core::script::{Script, setup_script};

#[cfg(feature = "alert-when-done")]
mod alert_task;
mod usb_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Raised with the completed pass count once the runner drains to idle.
pub(super) static RUN_FINISHED: Signal<CriticalSectionRawMutex, u32> = Signal::new();
pub(super) static USB_STORAGE: StaticCell<usb::UsbDeviceStorage> = StaticCell::new();
static MAIN_SCRIPT: StaticCell<MainScript> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA5, USB, PA11, PA12, ..
    } = hal::init(config);

    let commands: &'static MainScript = MAIN_SCRIPT
        .init_with(|| script::parse_main_script().expect("bundled main script must parse"));
    let main_script = Script::new(commands);
    defmt::info!(
        "macro: main script loaded commands={} ticks/pass={}",
        commands.len(),
        main_script.pass_ticks()
    );

    let runner = MacroRunner::new(setup_script(), main_script, script::macro_config());

    spawner
        .spawn(usb_task::run(USB, PA12, PA11, runner))
        .expect("failed to spawn USB task");

    #[cfg(feature = "alert-when-done")]
    spawner
        .spawn(alert_task::run(PA5))
        .expect("failed to spawn alert task");
    #[cfg(not(feature = "alert-when-done"))]
    let _ = PA5;

    core::future::pending::<()>().await;
}
