const BASELINE_CO2_PPM: f64 = 550.0;
/// CO2 exhaled per person, litres per hour.
const EMISSION_L_PER_H: f64 = 18.0;
const ELAPSED_H: f64 = 1.0;

/// Rough head count from how far CO2 sits above an empty room's baseline,
/// assuming the excess built up over the last hour.
pub fn estimate_occupancy(co2_ppm: f64, volume_m3: f64) -> u32 {
    if co2_ppm == 0.0 || !co2_ppm.is_finite() || !volume_m3.is_finite() {
        return 0;
    }
    let produced_l = (co2_ppm - BASELINE_CO2_PPM) * volume_m3 / 1000.0;
    let people = (produced_l / (EMISSION_L_PER_H * ELAPSED_H)).round();
    people.max(0.0) as u32
}
