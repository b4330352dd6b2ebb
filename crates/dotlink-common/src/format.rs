// SPDX-License-Identifier: GPL-3.0

//! Display helpers. On-chain amounts are formatted with integer arithmetic only.

/// Largest power of ten representable by `u128`.
const MAX_DECIMALS: u8 = 38;
/// Fractional digits shown by [`format_balance`].
const DISPLAY_PRECISION: usize = 4;

/// Truncates an address for display, e.g. `5Grwva...utQY`.
///
/// # Arguments
/// * `address` - The full address.
/// * `prefix` - Number of leading characters kept.
/// * `suffix` - Number of trailing characters kept.
pub fn format_address(address: &str, prefix: usize, suffix: usize) -> String {
	let chars: Vec<char> = address.chars().collect();
	if chars.len() <= prefix + suffix {
		return address.to_string();
	}
	let head: String = chars[..prefix].iter().collect();
	let tail: String = chars[chars.len() - suffix..].iter().collect();
	format!("{head}...{tail}")
}

/// Formats an amount of the smallest unit as a decimal token amount.
///
/// Up to four fractional digits are shown (truncated, trailing zeros trimmed).
///
/// # Arguments
/// * `amount` - Amount in the chain's smallest unit.
/// * `decimals` - Token decimals.
/// * `symbol` - Optional token symbol appended to the amount.
pub fn format_balance(amount: u128, decimals: u8, symbol: Option<&str>) -> String {
	let decimals = decimals.min(MAX_DECIMALS);
	let unit = 10u128.pow(decimals as u32);
	let whole = amount / unit;
	let fraction = amount % unit;

	let mut number = group_thousands(whole);
	if fraction > 0 {
		let digits = format!("{:0width$}", fraction, width = decimals as usize);
		let shown = digits[..digits.len().min(DISPLAY_PRECISION)].trim_end_matches('0');
		if !shown.is_empty() {
			number.push('.');
			number.push_str(shown);
		}
	}
	match symbol {
		Some(symbol) => format!("{number} {symbol}"),
		None => number,
	}
}

fn group_thousands(value: u128) -> String {
	let digits = value.to_string();
	let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
	for (i, c) in digits.chars().enumerate() {
		if i > 0 && (digits.len() - i) % 3 == 0 {
			grouped.push(',');
		}
		grouped.push(c);
	}
	grouped
}

/// Formats the time elapsed since `timestamp`, e.g. `5m ago`.
///
/// # Arguments
/// * `timestamp` - Milliseconds since the Unix epoch.
/// * `now` - The current time, in milliseconds since the Unix epoch.
pub fn format_time_ago(timestamp: u64, now: u64) -> String {
	let seconds = now.saturating_sub(timestamp) / 1_000;
	match seconds {
		0..60 => "just now".to_string(),
		60..3_600 => format!("{}m ago", seconds / 60),
		3_600..86_400 => format!("{}h ago", seconds / 3_600),
		86_400..604_800 => format!("{}d ago", seconds / 86_400),
		_ => format!("{}w ago", seconds / 604_800),
	}
}

/// Formats a number of blocks as an approximate duration, e.g. `12 hours`.
///
/// # Arguments
/// * `blocks` - Number of blocks.
/// * `block_time` - Seconds per block.
pub fn format_block_time(blocks: u64, block_time: u64) -> String {
	let seconds = blocks.saturating_mul(block_time);
	match seconds {
		0..60 => format!("{seconds} seconds"),
		60..3_600 => format!("{} minutes", seconds / 60),
		3_600..86_400 => format!("{} hours", seconds / 3_600),
		_ => format!("{} days", seconds / 86_400),
	}
}

/// Formats `value / total` as a percentage with the given number of decimals.
pub fn calculate_percentage(value: u128, total: u128, decimals: u32) -> String {
	if total == 0 {
		return "0%".to_string();
	}
	let scale = 10u128.pow(decimals.min(MAX_DECIMALS as u32 - 2));
	let scaled = match value.checked_mul(100 * scale) {
		Some(numerator) => numerator / total,
		None => value / (total / (100 * scale)).max(1),
	};
	if decimals == 0 {
		return format!("{scaled}%");
	}
	format!(
		"{}.{:0width$}%",
		scaled / scale,
		scaled % scale,
		width = decimals as usize
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn format_address_works() {
		let address = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
		assert_eq!(format_address(address, 6, 4), "5Grwva...utQY");
		assert_eq!(format_address("0xABCDEF", 6, 4), "0xABCDEF");
		assert_eq!(format_address("", 6, 4), "");
	}

	#[test]
	fn format_balance_works() {
		assert_eq!(format_balance(0, 12, Some("DOT")), "0 DOT");
		assert_eq!(format_balance(1_000_000_000_000, 12, Some("DOT")), "1 DOT");
		assert_eq!(format_balance(1_500_000_000_000, 12, None), "1.5");
		assert_eq!(format_balance(12_345_678_900_000, 10, Some("DOT")), "1,234.5678 DOT");
		assert_eq!(format_balance(1, 12, Some("KSM")), "0 KSM");
		assert_eq!(format_balance(1_250, 0, Some("UNIT")), "1,250 UNIT");
		assert_eq!(format_balance(u128::MAX, 255, None), "3.4028");
	}

	#[test]
	fn format_time_ago_works() {
		let now = 10_000_000_000;
		assert_eq!(format_time_ago(now - 5_000, now), "just now");
		assert_eq!(format_time_ago(now - 5 * 60_000, now), "5m ago");
		assert_eq!(format_time_ago(now - 2 * 3_600_000, now), "2h ago");
		assert_eq!(format_time_ago(now - 3 * 86_400_000, now), "3d ago");
		assert_eq!(format_time_ago(now - 14 * 86_400_000, now), "2w ago");
		assert_eq!(format_time_ago(now + 1_000, now), "just now");
	}

	#[test]
	fn format_block_time_works() {
		assert_eq!(format_block_time(7_200, 6), "12 hours");
		assert_eq!(format_block_time(5, 6), "30 seconds");
		assert_eq!(format_block_time(20, 6), "2 minutes");
		assert_eq!(format_block_time(28_800, 6), "2 days");
	}

	#[test]
	fn calculate_percentage_works() {
		assert_eq!(calculate_percentage(25, 100, 2), "25.00%");
		assert_eq!(calculate_percentage(1, 3, 2), "33.33%");
		assert_eq!(calculate_percentage(1, 0, 2), "0%");
		assert_eq!(calculate_percentage(1, 2, 0), "50%");
		assert_eq!(calculate_percentage(u128::MAX / 2, u128::MAX, 1), "50.0%");
	}
}
