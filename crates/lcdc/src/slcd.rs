//! Serial ("smart") LCD command host
//!
//! Smart panels take commands over the same pins the controller uses for
//! pixels. Attaching hands the pins to the serial engine; each byte is
//! then pushed through MDATA once the engine reports idle. The first byte
//! of a transfer is the command, the rest are its parameters.

use platform::RegisterMap;

use crate::error::SlcdError;
use crate::log::{debug, warning};
use crate::regs;

/// Busy poll interval
const BUSY_POLL_US: u32 = 4;
/// Busy poll deadline
const BUSY_TIMEOUT_US: u32 = 100_000;

/// Command transport for smart panels
pub struct SlcdHost<'a, R> {
    regs: &'a R,
}

impl<'a, R: RegisterMap> SlcdHost<'a, R> {
    /// Host over the controller's register map.
    pub const fn new(regs: &'a R) -> Self {
        Self { regs }
    }

    /// Give the panel pins to the serial engine, 8-bit commands and data.
    pub fn attach(&self) {
        debug!("slcd: attach");
        self.regs
            .update_bits(regs::REG_CFG, regs::CFG_SLCD, regs::CFG_SLCD);
        self.regs.write(
            regs::REG_SLCD_MCFG,
            regs::SLCD_MCFG_DWIDTH_8BIT | regs::SLCD_MCFG_CWIDTH_8BIT,
        );
    }

    /// Return the pins to the parallel timing generator.
    pub fn detach(&self) {
        debug!("slcd: detach");
        self.regs.update_bits(regs::REG_CFG, regs::CFG_SLCD, 0);
    }

    /// Send a command byte followed by its parameters.
    ///
    /// Returns the number of bytes sent.
    pub async fn transfer(&self, tx: &[u8]) -> Result<usize, SlcdError> {
        let (&cmd, params) = tx.split_first().ok_or(SlcdError::Empty)?;

        self.send(u32::from(cmd) | regs::SLCD_MDATA_COMMAND)
            .await
            .inspect_err(|_| warning!("slcd: unable to send command {:#x}", cmd))?;

        for &byte in params {
            self.send(u32::from(byte))
                .await
                .inspect_err(|_| warning!("slcd: unable to send data"))?;
        }

        Ok(tx.len())
    }

    /// Read back from the panel. The bus is write-only.
    pub async fn receive(&self, _cmd: u8, _rx: &mut [u8]) -> Result<usize, SlcdError> {
        Err(SlcdError::ReceiveUnsupported)
    }

    async fn send(&self, word: u32) -> Result<(), SlcdError> {
        self.regs
            .poll_until(
                regs::REG_SLCD_MSTATE,
                regs::SLCD_MSTATE_BUSY,
                0,
                BUSY_POLL_US,
                BUSY_TIMEOUT_US,
            )
            .await
            .map_err(|e| SlcdError::Timeout(e.into()))?;
        self.regs.write(regs::REG_SLCD_MDATA, word);
        Ok(())
    }
}
