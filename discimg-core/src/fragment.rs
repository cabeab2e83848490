//! The `Fragment` capability: a contiguous run of sectors within a track

use crate::error::Result;

/// A fragment supplies main-channel (and, where present, subchannel) bytes
/// for a contiguous run of sectors, addressed relative to the fragment's
/// own start (address 0 is the fragment's first sector).
///
/// Implementations own whatever decode state (decryption keys, compression
/// tables, a one-slot decode cache) their backing format needs; callers
/// only ever see plain sector reads.
pub trait Fragment {
    /// Number of sectors covered by this fragment.
    fn length(&self) -> u32;

    /// Read the main-channel bytes of the sector at `address` (0-based,
    /// relative to the fragment).
    fn read_main(&mut self, address: u32) -> Result<Vec<u8>>;

    /// Read the subchannel bytes of the sector at `address`, if this
    /// fragment carries subchannel data.
    fn read_subchannel(&mut self, address: u32) -> Result<Vec<u8>>;

    /// Read both channels for one sector. Default implementation composes
    /// `read_main`/`read_subchannel`; formats that decode both together
    /// (MDX, DAA) override it to avoid decoding the same group/chunk twice.
    fn read_sector(&mut self, address: u32) -> Result<crate::sector::Sector> {
        let main = self.read_main(address)?;
        let subchannel = if self.has_subchannel() {
            Some(self.read_subchannel(address)?)
        } else {
            None
        };
        Ok(crate::sector::Sector { main, subchannel })
    }

    /// Whether this fragment carries subchannel data at all.
    fn has_subchannel(&self) -> bool {
        false
    }
}
