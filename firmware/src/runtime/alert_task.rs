use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_time::{Duration, Ticker};

use super::RUN_FINISHED;
use crate::status;

/// Half period of the done indicator.
const ALERT_TOGGLE_MS: u64 = 250;

#[embassy_executor::task]
pub async fn run(pin: Peri<'static, hal::peripherals::PA5>) -> ! {
    let mut indicator = Output::new(pin, Level::Low, Speed::Low);

    let passes = RUN_FINISHED.wait().await;
    let snapshot = status::snapshot();
    defmt::info!(
        "alert: macro finished passes={} reports={}",
        passes,
        snapshot.reports_sent
    );

    let mut ticker = Ticker::every(Duration::from_millis(ALERT_TOGGLE_MS));
    loop {
        indicator.toggle();
        ticker.next().await;
    }
}
