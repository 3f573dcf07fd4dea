//! MQTT Paket-Rahmung für eingehende Daten
//!
//! Sammelt Bytes vom Socket, bis ein komplettes MQTT-Paket (Fixed Header,
//! Remaining Length, Rest) im Buffer liegt, und gibt erst dann Bytes an den
//! Client heraus. Der Zustand liegt im `PacketFramer` selbst, nicht in einem
//! Future: ein abgebrochener Lesevorgang verliert keine Bytes.
//!
//! Ablauf:
//! 1. `spare()` liefert genau den noch fehlenden Bereich des Pakets
//! 2. Nach dem Socket-Read `commit(n)` aufrufen
//! 3. Sobald `is_complete()`, mit `take()` ausliefern

use core::fmt;

/// Maximal 4 Bytes Remaining Length (MQTT 3.1.1 / 5)
const MAX_LENGTH_BYTES: usize = 4;

/// Fehler beim Rahmen eines Pakets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Remaining Length länger als 4 Bytes
    Malformed,
    /// Paket passt nicht in den Buffer
    TooLarge,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Malformed => f.write_str("malformed remaining length"),
            FrameError::TooLarge => f.write_str("packet too large"),
        }
    }
}

/// Puffer für genau ein eingehendes Paket mit Kapazität `N`
pub struct PacketFramer<const N: usize> {
    buf: [u8; N],
    filled: usize,
    served: usize,
    /// Gesamtlänge inkl. Header, sobald die Remaining Length bekannt ist
    total: Option<usize>,
}

impl<const N: usize> Default for PacketFramer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PacketFramer<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            filled: 0,
            served: 0,
            total: None,
        }
    }

    /// Paket liegt vollständig im Buffer
    pub fn is_complete(&self) -> bool {
        self.total == Some(self.filled)
    }

    /// Noch nicht ausgelieferte Bytes des aktuellen Pakets
    pub fn pending(&self) -> usize {
        if self.is_complete() {
            self.filled - self.served
        } else {
            0
        }
    }

    /// Bereich für den nächsten Socket-Read
    ///
    /// Solange der Header unvollständig ist, genau ein Byte; danach der
    /// Rest des Pakets. Liest nie über das Paketende hinaus.
    pub fn spare(&mut self) -> &mut [u8] {
        let end = match self.total {
            Some(total) => total,
            None => (self.filled + 1).min(N),
        };
        &mut self.buf[self.filled..end]
    }

    /// Übernimmt `n` frisch gelesene Bytes aus `spare()`
    pub fn commit(&mut self, n: usize) -> Result<(), FrameError> {
        self.filled = (self.filled + n).min(N);
        if self.total.is_none() {
            self.total = self.parse_total()?;
        }
        Ok(())
    }

    /// Kopiert Bytes des fertigen Pakets nach `out`
    ///
    /// Ist das Paket komplett ausgeliefert, beginnt das nächste.
    pub fn take(&mut self, out: &mut [u8]) -> usize {
        let n = self.pending().min(out.len());
        out[..n].copy_from_slice(&self.buf[self.served..self.served + n]);
        self.served += n;
        if self.is_complete() && self.served == self.filled {
            self.reset();
        }
        n
    }

    fn reset(&mut self) {
        self.filled = 0;
        self.served = 0;
        self.total = None;
    }

    /// Gesamtlänge, sobald die Remaining Length vollständig gelesen ist
    fn parse_total(&self) -> Result<Option<usize>, FrameError> {
        let mut remaining = 0usize;
        for (i, byte) in self.buf[1..self.filled.max(1)].iter().enumerate() {
            remaining |= usize::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                let total = 1 + (i + 1) + remaining;
                if total > N {
                    return Err(FrameError::TooLarge);
                }
                return Ok(Some(total));
            }
        }
        if self.filled > MAX_LENGTH_BYTES {
            return Err(FrameError::Malformed);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Füttert `data` in Stücken von `chunk` Bytes
    fn feed<const N: usize>(framer: &mut PacketFramer<N>, data: &[u8], chunk: usize) -> usize {
        let mut pos = 0;
        while pos < data.len() && !framer.is_complete() {
            let spare = framer.spare();
            let n = spare.len().min(chunk).min(data.len() - pos);
            spare[..n].copy_from_slice(&data[pos..pos + n]);
            framer.commit(n).unwrap();
            pos += n;
        }
        pos
    }

    #[test]
    fn test_single_byte_length() {
        // PUBLISH, Remaining Length 5
        let packet = [0x30, 0x05, 0, 1, b'a', b'h', b'i'];
        let mut framer = PacketFramer::<64>::new();

        assert_eq!(feed(&mut framer, &packet, 64), packet.len());
        assert!(framer.is_complete());
        assert_eq!(framer.pending(), 7);

        let mut out = [0u8; 16];
        assert_eq!(framer.take(&mut out), 7);
        assert_eq!(&out[..7], &packet);
        assert!(!framer.is_complete());
    }

    #[test]
    fn test_no_bytes_before_complete() {
        let packet = [0x30, 0x03, 0, 0, b'x'];
        let mut framer = PacketFramer::<64>::new();

        // Nur der Header ist da
        feed(&mut framer, &packet[..2], 64);
        let mut out = [0u8; 8];
        assert_eq!(framer.take(&mut out), 0);
        assert!(!framer.is_complete());

        feed(&mut framer, &packet[2..], 1);
        assert!(framer.is_complete());
        assert_eq!(framer.take(&mut out), 5);
    }

    #[test]
    fn test_multi_byte_length() {
        // Remaining Length 200 = 0xC8 0x01
        let mut packet = [0u8; 203];
        packet[0] = 0x30;
        packet[1] = 0xc8;
        packet[2] = 0x01;
        let mut framer = PacketFramer::<256>::new();

        assert_eq!(feed(&mut framer, &packet, 7), 203);
        assert!(framer.is_complete());
    }

    #[test]
    fn test_never_reads_past_packet_end() {
        let two_packets = [0xd0, 0x00, 0x30, 0x01, 0x42];
        let mut framer = PacketFramer::<16>::new();

        // PINGRESP
        assert_eq!(feed(&mut framer, &two_packets, 16), 2);
        assert!(framer.is_complete());
        let mut out = [0u8; 16];
        assert_eq!(framer.take(&mut out), 2);

        assert_eq!(feed(&mut framer, &two_packets[2..], 16), 3);
        assert_eq!(framer.take(&mut out), 3);
        assert_eq!(&out[..3], &[0x30, 0x01, 0x42]);
    }

    #[test]
    fn test_partial_take() {
        let packet = [0x30, 0x04, 1, 2, 3, 4];
        let mut framer = PacketFramer::<16>::new();
        feed(&mut framer, &packet, 16);

        let mut out = [0u8; 4];
        assert_eq!(framer.take(&mut out), 4);
        assert_eq!(framer.pending(), 2);
        assert_eq!(framer.take(&mut out), 2);
        assert_eq!(&out[..2], &[3, 4]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_too_large() {
        let mut framer = PacketFramer::<8>::new();
        framer.spare()[0] = 0x30;
        framer.commit(1).unwrap();
        framer.spare()[0] = 0x10;
        assert_eq!(framer.commit(1), Err(FrameError::TooLarge));
    }

    #[test]
    fn test_malformed_length() {
        let mut framer = PacketFramer::<64>::new();
        let header = [0x30, 0xff, 0xff, 0xff, 0xff];
        let mut result = Ok(());
        for byte in header {
            framer.spare()[0] = byte;
            result = framer.commit(1);
            if result.is_err() {
                break;
            }
        }
        assert_eq!(result, Err(FrameError::Malformed));
    }
}
