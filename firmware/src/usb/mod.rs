//! USB HID gamepad device.
//!
//! The controller enumerates as a HORI Pokken-style pad: one HID interface
//! with an 8-byte interrupt IN endpoint carrying [`ControllerReport`]s and an
//! 8-byte OUT endpoint whose reports are accepted and dropped. Embassy USB
//! bookkeeping stays in this module so the runtime only sees the reader,
//! writer, and device handles.
//!
//! [`ControllerReport`]: macro_core::report::ControllerReport

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use macro_core::report::REPORT_LEN;

/// Vendor id the console expects for a wired Pokken controller.
pub const USB_VID: u16 = 0x0F0D;
/// Product id the console expects for a wired Pokken controller.
pub const USB_PID: u16 = 0x0092;

/// `wMaxPacketSize` of both interrupt endpoints.
pub const HID_MAX_PACKET_SIZE: u16 = 8;
/// Endpoint size as a buffer length.
pub const HID_PACKET_SIZE: usize = HID_MAX_PACKET_SIZE as usize;

const _: () = assert!(HID_PACKET_SIZE == REPORT_LEN);
/// Host polling interval requested for the interrupt endpoints.
pub const HID_POLL_MS: u8 = 1;

#[cfg(target_os = "none")]
const MAX_PACKET_SIZE_0: u8 = 64;
#[cfg(target_os = "none")]
const CONTROL_BUFFER_LEN: usize = 64;
#[cfg(target_os = "none")]
const CONFIG_DESCRIPTOR_LEN: usize = 128;
#[cfg(target_os = "none")]
const BOS_DESCRIPTOR_LEN: usize = 64;
#[cfg(target_os = "none")]
const MSOS_DESCRIPTOR_LEN: usize = 64;

/// HID report descriptor: 16 buttons, a 4-bit hat with padding, four 8-bit
/// axes, one vendor byte, and an 8-byte vendor output report.
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    // --- Buttons ---
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x35, 0x00, //   Physical Minimum (0)
    0x45, 0x01, //   Physical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x10, //   Report Count (16)
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x10, //   Usage Maximum (16)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // --- HAT ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x25, 0x07, //   Logical Maximum (7)
    0x46, 0x3B, 0x01, //   Physical Maximum (315)
    0x75, 0x04, //   Report Size (4)
    0x95, 0x01, //   Report Count (1)
    0x65, 0x14, //   Unit (English Rotation, Degrees)
    0x09, 0x39, //   Usage (Hat Switch)
    0x81, 0x42, //   Input (Data, Variable, Absolute, Null State)
    0x65, 0x00, //   Unit (None)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x01, //   Input (Constant)
    // --- Sticks ---
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x46, 0xFF, 0x00, //   Physical Maximum (255)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x09, 0x32, //   Usage (Z)
    0x09, 0x35, //   Usage (Rz)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x04, //   Report Count (4)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // --- Vendor byte ---
    0x06, 0x00, 0xFF, //   Usage Page (Vendor Defined)
    0x09, 0x20, //   Usage (0x20)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // --- Output report ---
    0x0A, 0x21, 0x26, //   Usage (0x2621)
    0x95, 0x08, //   Report Count (8)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0xC0, // End Collection
];

/// User-visible strings advertised in the USB descriptors.
#[derive(Clone, Copy, Debug)]
pub struct UsbDeviceStrings {
    pub manufacturer: &'static str,
    pub product: &'static str,
    pub serial_number: Option<&'static str>,
}

impl Default for UsbDeviceStrings {
    fn default() -> Self {
        Self {
            manufacturer: "HORI CO.,LTD.",
            product: "POKKEN CONTROLLER",
            serial_number: None,
        }
    }
}

/// Backing storage for the Embassy USB builder and HID class.
#[cfg(target_os = "none")]
pub struct UsbDeviceStorage {
    control_buf: [u8; CONTROL_BUFFER_LEN],
    config_descriptor: [u8; CONFIG_DESCRIPTOR_LEN],
    bos_descriptor: [u8; BOS_DESCRIPTOR_LEN],
    msos_descriptor: [u8; MSOS_DESCRIPTOR_LEN],
    hid_state: embassy_usb::class::hid::State<'static>,
}

#[cfg(target_os = "none")]
impl UsbDeviceStorage {
    pub fn new() -> Self {
        Self {
            control_buf: [0; CONTROL_BUFFER_LEN],
            config_descriptor: [0; CONFIG_DESCRIPTOR_LEN],
            bos_descriptor: [0; BOS_DESCRIPTOR_LEN],
            msos_descriptor: [0; MSOS_DESCRIPTOR_LEN],
            hid_state: embassy_usb::class::hid::State::new(),
        }
    }
}

/// Drains OUT reports. Control-pipe report requests are left to the class
/// defaults, which stall them.
pub struct DiscardReports;

impl embassy_usb::class::hid::RequestHandler for DiscardReports {
    fn set_report(
        &mut self,
        _id: embassy_usb::class::hid::ReportId,
        _data: &[u8],
    ) -> embassy_usb::control::OutResponse {
        embassy_usb::control::OutResponse::Accepted
    }
}

/// Split handles for the HID gamepad interface plus the device to run.
#[cfg(target_os = "none")]
pub struct HidGamepad<D>
where
    D: embassy_usb::driver::Driver<'static>,
{
    pub device: embassy_usb::UsbDevice<'static, D>,
    pub reader: embassy_usb::class::hid::HidReader<'static, D, HID_PACKET_SIZE>,
    pub writer: embassy_usb::class::hid::HidWriter<'static, D, HID_PACKET_SIZE>,
}

#[cfg(target_os = "none")]
impl<D> HidGamepad<D>
where
    D: embassy_usb::driver::Driver<'static>,
{
    /// Builds the USB device exposing the gamepad interface.
    pub fn new(
        driver: D,
        storage: &'static mut UsbDeviceStorage,
        strings: UsbDeviceStrings,
    ) -> Self {
        let mut config = embassy_usb::Config::new(USB_VID, USB_PID);
        config.manufacturer = Some(strings.manufacturer);
        config.product = Some(strings.product);
        config.serial_number = strings.serial_number;
        config.max_packet_size_0 = MAX_PACKET_SIZE_0;
        config.max_power = 500;
        config.supports_remote_wakeup = false;

        let mut builder = embassy_usb::Builder::new(
            driver,
            config,
            &mut storage.config_descriptor,
            &mut storage.bos_descriptor,
            &mut storage.msos_descriptor,
            &mut storage.control_buf,
        );

        let hid_config = embassy_usb::class::hid::Config {
            report_descriptor: REPORT_DESCRIPTOR,
            request_handler: None,
            poll_ms: HID_POLL_MS,
            max_packet_size: HID_MAX_PACKET_SIZE,
            hid_subclass: embassy_usb::class::hid::HidSubclass::No,
            hid_boot_protocol: embassy_usb::class::hid::HidBootProtocol::None,
        };
        let hid = embassy_usb::class::hid::HidReaderWriter::<_, HID_PACKET_SIZE, HID_PACKET_SIZE>::new(
            &mut builder,
            &mut storage.hid_state,
            hid_config,
        );
        let (reader, writer) = hid.split();

        Self {
            device: builder.build(),
            reader,
            writer,
        }
    }
}
