use crc::{CRC_16_MODBUS, Crc};

const MODBUS_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Modbus CRC16 (reflected 0x8005, init 0xFFFF, no final xor)
pub fn crc16(data: &[u8]) -> u16 {
    MODBUS_CRC.checksum(data)
}

/// CRC16 in wire order: low byte first
pub fn crc16_le(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}
