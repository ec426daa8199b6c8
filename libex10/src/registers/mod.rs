// libex10-rs/libex10/src/registers/mod.rs
//! Static register catalog.
//!
//! Each register is described by an immutable [`RegisterInfo`]. The protocol
//! layer forms Read/Write segments from these descriptors; nothing here is
//! ever mutated at run time.

/// Registers of the application firmware.
pub mod application;
/// Registers of the bootloader.
pub mod bootloader;

/// Host access rights of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    #[allow(missing_docs)]
    ReadOnly,
    #[allow(missing_docs)]
    WriteOnly,
    #[allow(missing_docs)]
    ReadWrite,
    /// Not accessible from the host.
    Restricted,
}

impl Access {
    /// Allowed in a Read command.
    pub fn readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    /// Allowed in a Write command.
    pub fn writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// Register descriptor: base address, per-entry byte length and entry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterInfo {
    /// Register name; empty for raw ranges.
    pub name: &'static str,
    /// Address of the first entry.
    pub address: u16,
    /// Bytes per entry.
    pub length: u16,
    /// Entries in an indexed register, 1 otherwise.
    pub num_entries: u16,
    /// Host access rights.
    pub access: Access,
}

impl RegisterInfo {
    #[allow(missing_docs)]
    pub const fn new(
        name: &'static str,
        address: u16,
        length: u16,
        num_entries: u16,
        access: Access,
    ) -> Self {
        Self {
            name,
            address,
            length,
            num_entries,
            access,
        }
    }

    /// Ad hoc descriptor for a raw address range (partial access, test
    /// registers).
    pub const fn raw(address: u16, length: u16) -> Self {
        Self::new("", address, length, 1, Access::ReadWrite)
    }

    /// Bytes spanned by all entries.
    pub fn total_len(&self) -> usize {
        self.length as usize * self.num_entries as usize
    }

    /// Address of entry `index`, or `None` when the index is out of range.
    pub fn entry_address(&self, index: u16) -> Option<u16> {
        if index >= self.num_entries {
            return None;
        }
        let offset = self.length as u32 * index as u32;
        u16::try_from(self.address as u32 + offset).ok()
    }

    /// Descriptor for a single entry of an indexed register.
    pub fn entry(&self, index: u16) -> Option<Self> {
        self.entry_address(index).map(|address| Self {
            address,
            num_entries: 1,
            ..*self
        })
    }
}

/// Find an application register by base address.
pub fn find_application_register(address: u16) -> Option<&'static RegisterInfo> {
    application::ALL.iter().find(|r| r.address == address)
}

/// Find a bootloader register by base address.
pub fn find_bootloader_register(address: u16) -> Option<&'static RegisterInfo> {
    bootloader::ALL.iter().find(|r| r.address == address)
}

/// Find a register by its catalog name in either map, application first.
pub fn find_by_name(name: &str) -> Option<&'static RegisterInfo> {
    application::ALL
        .iter()
        .chain(bootloader::ALL.iter())
        .find(|r| r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_map_is_sorted_and_non_overlapping() {
        for pair in application::ALL.windows(2) {
            let end = pair[0].address as usize + pair[0].total_len();
            assert!(
                end <= pair[1].address as usize,
                "{} overlaps {}",
                pair[0].name,
                pair[1].name
            );
        }
    }

    #[test]
    fn core_registers_match_wire_addresses() {
        assert_eq!(application::STATUS.address, 0x0006);
        assert_eq!(application::INTERRUPT_STATUS.address, 0x00ac);
        assert_eq!(application::EVENT_FIFO_NUM_BYTES.length, 2);
        assert_eq!(application::OPS_CONTROL.length, 1);
        assert_eq!(bootloader::IMAGE_VALIDITY.address, 0x0039);
        assert_eq!(bootloader::FREF_FREQ.access, Access::ReadWrite);
    }

    #[test]
    fn entry_address_bounds() {
        let reg = application::AUX_ADC_RESULTS;
        assert_eq!(reg.entry_address(0), Some(0x0404));
        assert_eq!(reg.entry_address(14), Some(0x0404 + 28));
        assert_eq!(reg.entry_address(15), None);
        let e = reg.entry(3).unwrap();
        assert_eq!(e.num_entries, 1);
        assert_eq!(e.address, 0x040a);
    }

    #[test]
    fn lookup_by_address_and_name() {
        assert_eq!(
            find_application_register(0x0300).map(|r| r.name),
            Some("OpsControl")
        );
        assert_eq!(
            find_bootloader_register(0x005e).map(|r| r.name),
            Some("BootloaderGitHash")
        );
        assert_eq!(find_by_name("RemainReason"), Some(&bootloader::REMAIN_REASON));
        assert!(find_application_register(0x0001).is_none());
    }

    #[test]
    fn access_rights() {
        assert!(application::INTERRUPT_MASK.access.writable());
        assert!(!application::INTERRUPT_STATUS.access.writable());
        assert!(!application::INTERRUPT_MASK_SET.access.readable());
    }
}
