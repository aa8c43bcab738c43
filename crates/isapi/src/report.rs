//! Human-readable device report.

use crate::xml::DeviceInfoMap;

/// Identity fields, printed first and in this order.
pub const PRIORITY_FIELDS: [&str; 13] = [
    "deviceName",
    "model",
    "deviceType",
    "serialNumber",
    "subSerialNumber",
    "manufacturer",
    "firmwareVersion",
    "hardwareVersion",
    "deviceStatus",
    "deviceLocation",
    "macAddress",
    "deviceID",
    "systemContact",
];

/// Firmware fields. `firmwareVersion` is listed so it stays out of the
/// additional section, but it is only printed with the identity fields.
pub const FIRMWARE_FIELDS: [&str; 7] = [
    "firmwareVersion",
    "firmwareReleasedDate",
    "firmwareVersionInfo",
    "encoderVersion",
    "encoderReleasedDate",
    "bootVersion",
    "bootReleasedDate",
];

pub const EMPTY_REPORT: &str = "No se encontró información del dispositivo";

const DEVICE_HEADER: &str = "=== INFORMACIÓN DEL DISPOSITIVO ===";
const FIRMWARE_HEADER: &str = "=== INFORMACIÓN DE FIRMWARE ===";
const ADDITIONAL_HEADER: &str = "=== INFORMACIÓN ADICIONAL ===";

/// Render `info` as three sections: identity, firmware, then everything else sorted by key.
pub fn format_device_info(info: &DeviceInfoMap) -> String {
    if info.is_empty() {
        return EMPTY_REPORT.to_string();
    }

    let mut lines = vec![DEVICE_HEADER.to_string()];
    push_fields(&mut lines, info, PRIORITY_FIELDS.iter().copied());

    lines.push(String::new());
    lines.push(FIRMWARE_HEADER.to_string());
    push_fields(
        &mut lines,
        info,
        FIRMWARE_FIELDS
            .iter()
            .copied()
            .filter(|field| *field != "firmwareVersion"),
    );

    lines.push(String::new());
    lines.push(ADDITIONAL_HEADER.to_string());
    let mut rest: Vec<_> = info
        .iter()
        .filter(|(key, _)| {
            !PRIORITY_FIELDS.contains(&key.as_str()) && !FIRMWARE_FIELDS.contains(&key.as_str())
        })
        .collect();
    rest.sort_by(|a, b| a.0.cmp(b.0));
    lines.extend(rest.into_iter().map(|(key, value)| format!("{key}: {value}")));

    lines.join("\n")
}

fn push_fields<'a>(
    lines: &mut Vec<String>,
    info: &DeviceInfoMap,
    fields: impl Iterator<Item = &'a str>,
) {
    for field in fields {
        if let Some(value) = info.get(field) {
            lines.push(format!("{field}: {value}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> DeviceInfoMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_map_yields_fixed_message() {
        assert_eq!(
            format_device_info(&DeviceInfoMap::new()),
            "No se encontró información del dispositivo"
        );
    }

    #[test]
    fn sections_follow_fixed_order() {
        let info = map(&[
            ("zzzOther", "v"),
            ("model", "X"),
            ("deviceName", "DVR1"),
        ]);
        let report = format_device_info(&info);
        assert_eq!(
            report,
            "=== INFORMACIÓN DEL DISPOSITIVO ===\n\
             deviceName: DVR1\n\
             model: X\n\
             \n\
             === INFORMACIÓN DE FIRMWARE ===\n\
             \n\
             === INFORMACIÓN ADICIONAL ===\n\
             zzzOther: v"
        );
    }

    #[test]
    fn firmware_version_printed_once() {
        let info = map(&[
            ("bootVersion", "B1"),
            ("firmwareVersion", "V4.22"),
            ("firmwareReleasedDate", "build 191112"),
        ]);
        let report = format_device_info(&info);
        assert_eq!(report.matches("firmwareVersion:").count(), 1);
        let device = report.find("firmwareVersion: V4.22").expect("identity line");
        let firmware = report.find(FIRMWARE_HEADER).expect("firmware header");
        assert!(device < firmware);
        let released = report.find("firmwareReleasedDate").expect("released line");
        let boot = report.find("bootVersion").expect("boot line");
        assert!(firmware < released && released < boot);
    }

    #[test]
    fn additional_fields_are_sorted() {
        let info = map(&[
            ("supportNTP", "true"),
            ("OEMCode", "1"),
            ("alarmOutNum", "4"),
            ("serialNumber", "S"),
        ]);
        let report = format_device_info(&info);
        let additional = report
            .split(ADDITIONAL_HEADER)
            .nth(1)
            .expect("additional section");
        let keys: Vec<_> = additional
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.split(':').next().unwrap_or_default())
            .collect();
        assert_eq!(keys, ["OEMCode", "alarmOutNum", "supportNTP"]);
    }
}
