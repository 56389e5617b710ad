use super::{RUN_FINISHED, USB_STORAGE};
use crate::status;
use crate::telemetry::{self, FirmwareInstant, FirmwareTelemetry};
use crate::usb::{self, DiscardReports, UsbDeviceStrings};
use embassy_futures::join::join3;
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_usb::class::hid::HidWriter;
use embassy_usb::driver::EndpointError;
use macro_core::report::REPORT_LEN;
use macro_core::runner::MacroRunner;

embassy_stm32::bind_interrupts!(struct UsbIrqs {
    USB_UCPD1_2 => embassy_stm32::usb::InterruptHandler<hal::peripherals::USB>;
});

#[embassy_executor::task]
pub async fn run(
    usb: Peri<'static, hal::peripherals::USB>,
    dp: Peri<'static, hal::peripherals::PA12>,
    dm: Peri<'static, hal::peripherals::PA11>,
    runner: MacroRunner<'static>,
) -> ! {
    let storage = USB_STORAGE.init(usb::UsbDeviceStorage::new());
    let driver = embassy_stm32::usb::Driver::new(usb, UsbIrqs, dp, dm);

    let usb::HidGamepad {
        mut device,
        reader,
        writer,
    } = usb::HidGamepad::new(driver, storage, UsbDeviceStrings::default());

    let mut discard = DiscardReports;
    let drain_future = reader.run(false, &mut discard);
    let report_future = stream_reports(writer, runner);

    join3(device.run(), drain_future, report_future).await;
    loop {
        core::future::pending::<()>().await;
    }
}

/// Hands one runner report to the IN endpoint per completed write.
///
/// A report that fails because the endpoint went away is kept and resent
/// once the host re-enables the interface, so no tick is lost.
async fn stream_reports<D>(
    mut writer: HidWriter<'static, D, { usb::HID_PACKET_SIZE }>,
    mut runner: MacroRunner<'static>,
) -> !
where
    D: embassy_usb::driver::Driver<'static>,
{
    let mut telemetry = FirmwareTelemetry::new();
    let mut pending: Option<[u8; REPORT_LEN]> = None;

    loop {
        writer.ready().await;
        status::set_link_ready(true);
        defmt::info!("usb: HID interface ready");

        loop {
            let bytes = match pending.take() {
                Some(bytes) => bytes,
                None => {
                    let poll = runner.poll();
                    telemetry::record_poll(&mut telemetry, &poll, FirmwareInstant::now());
                    if let Some(pass) = poll.completed_pass {
                        status::record_pass(pass);
                    }
                    if runner.is_finished() && status::mark_idle() {
                        defmt::info!("macro: idle after {} passes", runner.passes());
                        RUN_FINISHED.signal(runner.passes());
                    }
                    poll.frame.report.to_bytes()
                }
            };

            match writer.write(&bytes).await {
                Ok(()) => status::record_report_sent(),
                Err(EndpointError::Disabled) => {
                    defmt::warn!("usb: HID interface disabled");
                    pending = Some(bytes);
                    status::set_link_ready(false);
                    break;
                }
                Err(EndpointError::BufferOverflow) => {
                    defmt::warn!("usb: HID report rejected (overflow)");
                }
            }
        }
    }
}
