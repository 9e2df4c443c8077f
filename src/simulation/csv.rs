// src/simulation/csv.rs

use std::io::Write;

use crate::models::pose::{TargetState, VehicleState};

/// CSVヘッダーの書き込み
pub fn write_csv_header<W: Write>(writer: &mut W) -> Result<(), std::io::Error> {
    let mut header = String::from("time(s),");
    header.push_str("vehicle_x(m),vehicle_y(m),vehicle_z(m),");
    header.push_str("vehicle_vx(m/s),vehicle_vy(m/s),vehicle_vz(m/s),");
    header.push_str("target_x(m),target_y(m),target_z(m),");
    header.push_str("following(bool)\n");
    writer.write_all(header.as_bytes())
}

/// CSV行の作成
pub fn create_csv_row(
    time: f64,
    vehicle: &VehicleState,
    target: &TargetState,
    following: bool,
) -> String {
    format!(
        "{:.2},{},{},{},{},{},{},{},{},{},{}\n",
        time,
        vehicle.position.x,
        vehicle.position.y,
        vehicle.position.z,
        vehicle.linear_velocity.x,
        vehicle.linear_velocity.y,
        vehicle.linear_velocity.z,
        target.position.x,
        target.position.y,
        target.position.z,
        following
    )
}
