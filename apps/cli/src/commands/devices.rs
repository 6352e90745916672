//! 列出已连接的相机

use anyhow::Result;
use clap::Args;
use depthcap_sensor::CameraBackend;

#[derive(Args, Debug)]
pub struct DevicesCommand {}

impl DevicesCommand {
    pub fn execute<B: CameraBackend>(&self, backend: &B) -> Result<()> {
        let devices = backend.list_devices()?;
        if devices.is_empty() {
            println!("未发现相机");
            return Ok(());
        }

        println!("已连接的相机:");
        for device in devices {
            println!("  SN{:<10} {}", device.serial, device.model);
        }
        Ok(())
    }
}
