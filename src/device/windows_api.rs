//! Windows device backend
//!
//! Reads come from WMI (`Win32_PnPEntity`), which exposes friendly names and a
//! plain `Status` string. State changes go through SetupAPI: the HID device
//! information set is walked, the first device whose instance id or hardware
//! ids contain the requested fragment gets a `DIF_PROPERTYCHANGE` with
//! `DICS_ENABLE` / `DICS_DISABLE`. Changing device state requires elevation.
//!
//! The WMI connection is COM-apartment bound; build this backend on the thread
//! that will use it (see `DeviceWorker`).

use crate::device::status::escape_wql_string;
use crate::device::toggle::HardwareIdMatch;
use crate::device::{DeviceBackend, DeviceRecord, STATUS_OK};
use crate::error::{HandsOffError, Result, StringError};
use serde::Deserialize;
use tracing::{debug, info};
use windows::Win32::Devices::DeviceAndDriverInstallation::{
    DICS_DISABLE, DICS_ENABLE, DICS_FLAG_GLOBAL, DIF_PROPERTYCHANGE, DIGCF_PRESENT, HDEVINFO,
    SETUP_DI_REGISTRY_PROPERTY, SP_CLASSINSTALL_HEADER, SP_DEVINFO_DATA, SP_PROPCHANGE_PARAMS,
    SPDRP_HARDWAREID, SetupDiCallClassInstaller, SetupDiDestroyDeviceInfoList,
    SetupDiEnumDeviceInfo, SetupDiGetClassDevsW, SetupDiGetDeviceInstanceIdW,
    SetupDiGetDeviceRegistryPropertyW, SetupDiSetClassInstallParamsW,
};
use windows::Win32::Foundation::{ERROR_ACCESS_DENIED, ERROR_NO_MORE_ITEMS};
use windows::core::{GUID, PCWSTR};
use wmi::{COMLibrary, WMIConnection};

/// HID setup class, same value as `HID_CLASS_GUID`
const HID_CLASS: GUID = GUID::from_u128(0x745a17a0_74d3_11d0_b6fe_00a0c90f57da);

/// Longest device instance id (`MAX_DEVICE_ID_LEN`) plus terminator
const INSTANCE_ID_CAPACITY: usize = 201;

#[derive(Debug, Deserialize)]
#[serde(rename = "Win32_PnPEntity")]
struct PnpEntity {
    #[serde(rename = "DeviceID")]
    device_id: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Status")]
    status: Option<String>,
}

impl PnpEntity {
    fn into_record(self) -> Option<DeviceRecord> {
        let instance_id = self.device_id?;
        let display_name = self.name.unwrap_or_else(|| instance_id.clone());
        Some(DeviceRecord {
            status_ok: self.status.as_deref() == Some(STATUS_OK),
            instance_id,
            display_name,
        })
    }
}

/// Device backend over WMI and SetupAPI
pub struct WindowsDeviceBackend {
    wmi: WMIConnection,
}

impl WindowsDeviceBackend {
    /// Initialise COM on the current thread and connect to `root\CIMV2`
    pub fn new() -> Result<Self> {
        let com = COMLibrary::new().map_err(|e| {
            HandsOffError::QueryFailed(StringError::new(format!("COM init failed: {e}")))
        })?;
        let wmi = WMIConnection::new(com).map_err(|e| {
            HandsOffError::QueryFailed(StringError::new(format!("WMI connect failed: {e}")))
        })?;
        info!("Connected to WMI");
        Ok(Self { wmi })
    }

    fn query(&self, wql: &str) -> Result<Vec<PnpEntity>> {
        debug!("WMI query: {}", wql);
        self.wmi
            .raw_query(wql)
            .map_err(|e| HandsOffError::QueryFailed(StringError::new(e.to_string())))
    }
}

impl DeviceBackend for WindowsDeviceBackend {
    fn enumerate(&self, class_guid: &str) -> Result<Vec<DeviceRecord>> {
        let wql = format!(
            "SELECT DeviceID, Name, Status FROM Win32_PnPEntity WHERE ClassGuid = '{}'",
            escape_wql_string(class_guid)
        );
        Ok(self
            .query(&wql)?
            .into_iter()
            .filter_map(PnpEntity::into_record)
            .collect())
    }

    fn find_by_instance_id(&self, instance_id: &str) -> Result<Option<DeviceRecord>> {
        let wql = format!(
            "SELECT DeviceID, Name, Status FROM Win32_PnPEntity WHERE DeviceID = '{}'",
            escape_wql_string(instance_id)
        );
        Ok(self
            .query(&wql)?
            .into_iter()
            .find_map(PnpEntity::into_record))
    }

    fn set_enabled(&self, matcher: &HardwareIdMatch, enabled: bool) -> Result<()> {
        let set = DeviceInfoSet::open(&HID_CLASS)?;
        let (instance_id, data) = set
            .find(matcher)?
            .ok_or_else(|| HandsOffError::DeviceNotFound(matcher.fragment().to_string()))?;

        debug!("Device manager match for {}: {}", matcher.fragment(), instance_id);
        set.change_state(&data, enabled)
            .map_err(|e| classify_state_change_error(e, &instance_id))
    }
}

fn classify_state_change_error(error: windows::core::Error, instance_id: &str) -> HandsOffError {
    if error.code() == ERROR_ACCESS_DENIED.to_hresult() {
        HandsOffError::PermissionDenied(format!("{instance_id}: {}", error.message()))
    } else {
        HandsOffError::DeviceControlFailed(Box::new(error))
    }
}

/// Owned SetupAPI device information set, destroyed on drop
struct DeviceInfoSet(HDEVINFO);

#[expect(
    unsafe_code,
    reason = "Windows FFI for SetupDi* device enumeration and class installer calls"
)]
impl DeviceInfoSet {
    /// Present devices of one setup class
    fn open(class_guid: &GUID) -> Result<Self> {
        // SAFETY: class_guid outlives the call; a null enumerator and no parent
        // window are valid arguments.
        let handle = unsafe {
            SetupDiGetClassDevsW(
                Some(std::ptr::from_ref(class_guid)),
                PCWSTR::null(),
                None,
                DIGCF_PRESENT,
            )
        }
        .map_err(|e| HandsOffError::DeviceControlFailed(Box::new(e)))?;
        Ok(Self(handle))
    }

    /// Device whose instance id equals the fragment, else the first whose
    /// instance id or hardware ids contain it
    fn find(&self, matcher: &HardwareIdMatch) -> Result<Option<(String, SP_DEVINFO_DATA)>> {
        let mut index = 0;
        let mut loose = None;
        loop {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "size_of::<SP_DEVINFO_DATA>() is a compile-time constant that fits in u32"
            )]
            let mut data = SP_DEVINFO_DATA {
                cbSize: size_of::<SP_DEVINFO_DATA>() as u32,
                ..Default::default()
            };

            // SAFETY: the set handle is valid for self's lifetime and data.cbSize is set.
            if let Err(e) = unsafe { SetupDiEnumDeviceInfo(self.0, index, &raw mut data) } {
                if e.code() == ERROR_NO_MORE_ITEMS.to_hresult() {
                    return Ok(loose);
                }
                return Err(HandsOffError::DeviceControlFailed(Box::new(e)));
            }
            index += 1;

            let instance_id = self.instance_id(&data).unwrap_or_default();
            if matcher.is_exact(&instance_id) {
                return Ok(Some((instance_id, data)));
            }
            if loose.is_some() {
                continue;
            }

            let hardware_ids = self.multi_sz_property(&data, SPDRP_HARDWAREID);
            if matcher.matches(&instance_id)
                || matcher.matches_any(hardware_ids.iter().map(String::as_str))
            {
                loose = Some((instance_id, data));
            }
        }
    }

    fn instance_id(&self, data: &SP_DEVINFO_DATA) -> Option<String> {
        let mut buffer = [0u16; INSTANCE_ID_CAPACITY];
        // SAFETY: data came from SetupDiEnumDeviceInfo on this set; buffer is a
        // valid mutable slice.
        unsafe {
            SetupDiGetDeviceInstanceIdW(self.0, std::ptr::from_ref(data), Some(&mut buffer), None)
        }
        .ok()?;
        let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
        Some(String::from_utf16_lossy(&buffer[..len]))
    }

    fn multi_sz_property(
        &self,
        data: &SP_DEVINFO_DATA,
        property: SETUP_DI_REGISTRY_PROPERTY,
    ) -> Vec<String> {
        let mut required = 0u32;
        // Size probe; fails with ERROR_INSUFFICIENT_BUFFER and fills `required`.
        // SAFETY: data is valid for this set; required is a valid out pointer.
        let _ = unsafe {
            SetupDiGetDeviceRegistryPropertyW(
                self.0,
                std::ptr::from_ref(data),
                property,
                None,
                None,
                Some(&raw mut required),
            )
        };
        if required == 0 {
            return Vec::new();
        }

        let mut buffer = vec![0u8; required as usize];
        // SAFETY: buffer has exactly `required` bytes.
        let read = unsafe {
            SetupDiGetDeviceRegistryPropertyW(
                self.0,
                std::ptr::from_ref(data),
                property,
                None,
                Some(&mut buffer),
                None,
            )
        };
        if read.is_err() {
            return Vec::new();
        }

        let wide: Vec<u16> = buffer
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        parse_multi_sz(&wide)
    }

    /// Enable or disable one device globally (all hardware profiles)
    fn change_state(&self, data: &SP_DEVINFO_DATA, enabled: bool) -> windows::core::Result<()> {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "SetupAPI structure sizes are compile-time constants that fit in u32"
        )]
        let params = SP_PROPCHANGE_PARAMS {
            ClassInstallHeader: SP_CLASSINSTALL_HEADER {
                cbSize: size_of::<SP_CLASSINSTALL_HEADER>() as u32,
                InstallFunction: DIF_PROPERTYCHANGE,
            },
            StateChange: if enabled { DICS_ENABLE } else { DICS_DISABLE },
            Scope: DICS_FLAG_GLOBAL,
            HwProfile: 0,
        };

        #[expect(
            clippy::cast_possible_truncation,
            reason = "size_of::<SP_PROPCHANGE_PARAMS>() is a compile-time constant that fits in u32"
        )]
        let params_size = size_of::<SP_PROPCHANGE_PARAMS>() as u32;

        // SAFETY: params starts with its class install header and lives across
        // both calls; data belongs to this set.
        unsafe {
            SetupDiSetClassInstallParamsW(
                self.0,
                Some(std::ptr::from_ref(data)),
                Some(std::ptr::from_ref(&params.ClassInstallHeader)),
                params_size,
            )?;
            SetupDiCallClassInstaller(DIF_PROPERTYCHANGE, self.0, Some(std::ptr::from_ref(data)))?;
        }

        info!(
            "Device manager accepted {} request",
            if enabled { "enable" } else { "disable" }
        );
        Ok(())
    }
}

impl Drop for DeviceInfoSet {
    #[expect(unsafe_code, reason = "Windows FFI to release the device information set")]
    fn drop(&mut self) {
        // SAFETY: the handle came from SetupDiGetClassDevsW and is released once.
        unsafe {
            let _ = SetupDiDestroyDeviceInfoList(self.0);
        }
    }
}

/// Split a `REG_MULTI_SZ` value into its strings
fn parse_multi_sz(wide: &[u16]) -> Vec<String> {
    wide.split(|&c| c == 0)
        .filter(|s| !s.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn test_parse_multi_sz() {
        let wide = to_wide("HID\\VID_04F3&PID_2A1C&REV_0001\0HID\\VID_04F3&PID_2A1C\0\0");
        assert_eq!(
            parse_multi_sz(&wide),
            ["HID\\VID_04F3&PID_2A1C&REV_0001", "HID\\VID_04F3&PID_2A1C"]
        );
        assert!(parse_multi_sz(&[0, 0]).is_empty());
    }

    #[test]
    fn test_hid_class_constant_matches_string() {
        let formatted = format!("{{{HID_CLASS:?}}}").to_lowercase();
        assert_eq!(formatted, crate::device::HID_CLASS_GUID);
    }

    #[test]
    fn test_entity_without_id_is_skipped() {
        let entity = PnpEntity {
            device_id: None,
            name: Some("Ghost".to_string()),
            status: Some("OK".to_string()),
        };
        assert!(entity.into_record().is_none());
    }

    #[test]
    fn test_entity_status_maps_to_enabled() {
        let entity = PnpEntity {
            device_id: Some("HID\\A".to_string()),
            name: None,
            status: Some("Error".to_string()),
        };
        let record = entity.into_record().unwrap();
        assert!(!record.status_ok);
        assert_eq!(record.display_name, "HID\\A");
    }

    #[test]
    fn test_access_denied_is_permission_error() {
        let error = windows::core::Error::from(ERROR_ACCESS_DENIED.to_hresult());
        assert!(matches!(
            classify_state_change_error(error, "HID\\A"),
            HandsOffError::PermissionDenied(_)
        ));
    }
}
