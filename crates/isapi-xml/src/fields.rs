//! Device identity extraction from a `/ISAPI/System/deviceInfo` document.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::{split_namespace, XmlElement};

/// Field name to value, in the order fields were first found.
pub type DeviceInfoMap = IndexMap<String, String>;

/// Fields searched for anywhere in the document, in lookup order.
pub const KNOWN_FIELDS: [&str; 42] = [
    "deviceName",
    "deviceID",
    "deviceDescription",
    "deviceLocation",
    "deviceStatus",
    "deviceType",
    "model",
    "serialNumber",
    "macAddress",
    "firmwareVersion",
    "firmwareReleasedDate",
    "bootVersion",
    "bootReleasedDate",
    "hardwareVersion",
    "encoderVersion",
    "encoderReleasedDate",
    "deviceLanguage",
    "channelNums",
    "analogChannelNums",
    "digitalChannelNums",
    "videoInNums",
    "videoOutNums",
    "bitRate",
    "bitRateType",
    "resolution",
    "frameRate",
    "eventLog",
    "supportFTP",
    "supportddns",
    "supportEmail",
    "supportNTP",
    "supportPPPoE",
    "supportWireless",
    "supportIPv6",
    "systemContact",
    "telecontrolID",
    "supportBeep",
    "supportVideoLoss",
    "firmwareVersionInfo",
    "manufacturer",
    "subSerialNumber",
    "OEMCode",
];

/// Collect device fields from `root`.
///
/// Known fields are looked up at any depth using the root's namespace and kept
/// verbatim. Direct children not already captured are then added under their
/// local name with surrounding whitespace stripped. A key is never overwritten
/// once set.
pub fn extract_device_info(root: &XmlElement) -> DeviceInfoMap {
    let namespace = root.namespace_prefix();
    let mut info = DeviceInfoMap::new();

    for field in KNOWN_FIELDS {
        let tag = format!("{namespace}{field}");
        let Some(text) = root.find_descendant(&tag).and_then(XmlElement::text) else {
            continue;
        };
        trace!(field, "known field found");
        info.insert(field.to_string(), text.to_string());
    }
    let known = info.len();

    for child in root.children() {
        let (_, local) = split_namespace(child.tag());
        if info.contains_key(local) {
            continue;
        }
        let Some(text) = child.text().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        trace!(field = local, "extra field found");
        info.insert(local.to_string(), text.to_string());
    }

    debug!(known, extra = info.len() - known, "extracted device info");
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    const HIKVISION_NS: &str = "http://www.hikvision.com/ver20/XMLSchema";

    #[test]
    fn known_field_keeps_original_text() {
        let root = parse(b"<DeviceInfo><deviceName> Front NVR </deviceName></DeviceInfo>")
            .expect("parse");
        let info = extract_device_info(&root);
        assert_eq!(info.get("deviceName").map(String::as_str), Some(" Front NVR "));
    }

    #[test]
    fn unknown_child_is_trimmed() {
        let root = parse(b"<DeviceInfo><customField>  hello  </customField></DeviceInfo>")
            .expect("parse");
        let info = extract_device_info(&root);
        assert_eq!(info.get("customField").map(String::as_str), Some("hello"));
    }

    #[test]
    fn namespaced_document_is_matched() {
        let xml = format!(
            r#"<a:deviceInfo xmlns:a="{HIKVISION_NS}"><a:model>X</a:model><a:extra>e</a:extra></a:deviceInfo>"#
        );
        let info = extract_device_info(&parse(xml.as_bytes()).expect("parse"));
        assert_eq!(info.get("model").map(String::as_str), Some("X"));
        assert_eq!(info.get("extra").map(String::as_str), Some("e"));
    }

    #[test]
    fn hikvision_payload() {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<DeviceInfo version="2.0" xmlns="{HIKVISION_NS}">
<deviceName>Network Video Recorder</deviceName>
<deviceID>48443031-3031-3131-3838-bcbac2d5b9a3</deviceID>
<model>DS-7608NI-K2</model>
<serialNumber>DS-7608NI-K20820191010CCRRD12345678WCVU</serialNumber>
<macAddress>bc:ba:c2:d5:b9:a3</macAddress>
<firmwareVersion>V4.22.005</firmwareVersion>
<firmwareReleasedDate>build 191112</firmwareReleasedDate>
<encoderVersion>V5.0</encoderVersion>
<deviceType>NVR</deviceType>
<telecontrolID>255</telecontrolID>
<supportBeep>true</supportBeep>
<localZoneNum>0</localZoneNum>
<alarmOutNum>1</alarmOutNum>
</DeviceInfo>"#
        );
        let info = extract_device_info(&parse(xml.as_bytes()).expect("parse"));
        assert_eq!(info["model"], "DS-7608NI-K2");
        assert_eq!(info["firmwareReleasedDate"], "build 191112");
        assert_eq!(info["localZoneNum"], "0");
        assert_eq!(info["alarmOutNum"], "1");
        assert_eq!(info.len(), 13);
        let first: Vec<_> = info.keys().take(3).map(String::as_str).collect();
        assert_eq!(first, ["deviceName", "deviceID", "deviceType"]);
    }

    #[test]
    fn nested_known_field_wins_over_direct_child() {
        let xml = b"<DeviceInfo><info><model>nested</model></info><model>direct</model></DeviceInfo>";
        let info = extract_device_info(&parse(xml).expect("parse"));
        assert_eq!(info["model"], "nested");
    }

    #[test]
    fn empty_and_blank_elements_are_skipped() {
        let xml = b"<DeviceInfo><deviceName/><model></model><note>   </note><serialNumber> </serialNumber></DeviceInfo>";
        let info = extract_device_info(&parse(xml).expect("parse"));
        assert!(!info.contains_key("deviceName"));
        assert!(!info.contains_key("model"));
        assert!(!info.contains_key("note"));
        // Known fields are not trimmed, so whitespace-only text still counts.
        assert_eq!(info["serialNumber"], " ");
    }

    #[test]
    fn grandchildren_are_not_collected_as_extras() {
        let xml = b"<DeviceInfo><network><ipAddress>10.0.0.2</ipAddress></network></DeviceInfo>";
        let info = extract_device_info(&parse(xml).expect("parse"));
        assert!(info.is_empty());
    }

    #[test]
    fn foreign_namespace_only_reaches_fallback_scan() {
        let xml = br#"<DeviceInfo xmlns="urn:a"><model xmlns="urn:b">  other </model><x><serialNumber xmlns="urn:b">S</serialNumber></x></DeviceInfo>"#;
        let info = extract_device_info(&parse(xml).expect("parse"));
        // Found by the direct-child scan, hence trimmed.
        assert_eq!(info.get("model").map(String::as_str), Some("other"));
        assert!(!info.contains_key("serialNumber"));
    }
}
