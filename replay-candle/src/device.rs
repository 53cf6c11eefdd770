use anyhow::Result;
use replay_core::Device;

/// Converts the storage location of a configuration into a candle device.
///
/// Fails if the device is not available, e.g., when candle is built without
/// CUDA support.
pub fn to_candle_device(device: Device) -> Result<candle_core::Device> {
    let device = match device {
        Device::Cpu => candle_core::Device::Cpu,
        Device::Cuda(n) => candle_core::Device::new_cuda(n)?,
        Device::Metal(n) => candle_core::Device::new_metal(n)?,
    };
    Ok(device)
}
