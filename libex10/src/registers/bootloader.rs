// libex10-rs/libex10/src/registers/bootloader.rs
//! Bootloader register map. Only valid while the device runs the bootloader.
#![allow(missing_docs)]

use super::{Access, RegisterInfo};

pub const RAM_IMAGE_RETURN_VALUE: RegisterInfo =
    RegisterInfo::new("RamImageReturnValue", 0x0030, 0x0004, 1, Access::ReadOnly);
pub const FREF_FREQ: RegisterInfo =
    RegisterInfo::new("FrefFreq", 0x0034, 0x0004, 1, Access::ReadWrite);
pub const REMAIN_REASON: RegisterInfo =
    RegisterInfo::new("RemainReason", 0x0038, 0x0001, 1, Access::ReadOnly);
pub const IMAGE_VALIDITY: RegisterInfo =
    RegisterInfo::new("ImageValidity", 0x0039, 0x0001, 1, Access::ReadOnly);
pub const BOOTLOADER_VERSION_STRING: RegisterInfo =
    RegisterInfo::new("BootloaderVersionString", 0x003a, 0x0020, 1, Access::ReadOnly);
pub const BOOTLOADER_BUILD_NUMBER: RegisterInfo =
    RegisterInfo::new("BootloaderBuildNumber", 0x005a, 0x0004, 1, Access::ReadOnly);
pub const BOOTLOADER_GIT_HASH: RegisterInfo =
    RegisterInfo::new("BootloaderGitHash", 0x005e, 0x0004, 1, Access::ReadOnly);
pub const CRASH_INFO: RegisterInfo =
    RegisterInfo::new("CrashInfo", 0x0100, 0x0100, 1, Access::ReadOnly);

/// Every register in this address map, sorted by address.
pub static ALL: &[RegisterInfo] = &[
    RAM_IMAGE_RETURN_VALUE,
    FREF_FREQ,
    REMAIN_REASON,
    IMAGE_VALIDITY,
    BOOTLOADER_VERSION_STRING,
    BOOTLOADER_BUILD_NUMBER,
    BOOTLOADER_GIT_HASH,
    CRASH_INFO,
];
