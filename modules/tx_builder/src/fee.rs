//! Fee, minimum lovelace and collateral arithmetic

use num_rational::Ratio;
use portico_common::{
    protocol_params::ProtocolParams, rational_number::RationalNumber, ExUnitPrices, ExUnits,
    Lovelace, TransactionOutput,
};

/// Bytes of overhead the ledger adds to every output when sizing min-UTxO
pub const UTXO_ENTRY_OVERHEAD: u64 = 160;

/// Reference script bytes priced at one rate before the next tier starts
pub const REF_SCRIPT_TIER_SIZE: u64 = 25_600;

type BigRatio = Ratio<u128>;

fn widen(r: &RationalNumber) -> BigRatio {
    BigRatio::new(*r.numer() as u128, *r.denom() as u128)
}

fn clamp(value: u128) -> Lovelace {
    Lovelace::try_from(value).unwrap_or(Lovelace::MAX)
}

/// `min_fee_a * size + min_fee_b`
pub fn linear_fee(params: &ProtocolParams, tx_size: usize) -> Lovelace {
    params.min_fee_a.saturating_mul(tx_size as u64).saturating_add(params.min_fee_b)
}

/// Execution cost of a budget, rounded up once over the exact sum
pub fn script_fee(prices: &ExUnitPrices, units: ExUnits) -> Lovelace {
    let cost = widen(&prices.mem_price) * BigRatio::from_integer(units.mem as u128)
        + widen(&prices.step_price) * BigRatio::from_integer(units.steps as u128);
    clamp(cost.ceil().to_integer())
}

/// Conway reference script fee: each 25 600 byte tier costs 1.2 times the
/// previous one, the total rounded down
pub fn ref_script_fee(base_price: &RationalNumber, ref_script_bytes: u64) -> Lovelace {
    let multiplier = BigRatio::new(6, 5);
    let mut price = widen(base_price);
    let mut total = BigRatio::from_integer(0);
    let mut remaining = ref_script_bytes as u128;
    let tier = REF_SCRIPT_TIER_SIZE as u128;
    while remaining >= tier {
        total += price * BigRatio::from_integer(tier);
        price *= multiplier;
        remaining -= tier;
    }
    total += price * BigRatio::from_integer(remaining);
    clamp(total.floor().to_integer())
}

/// Full minimum fee for a transaction of `tx_size` bytes
pub fn min_fee(
    params: &ProtocolParams,
    tx_size: usize,
    units: ExUnits,
    ref_script_bytes: u64,
) -> Lovelace {
    linear_fee(params, tx_size)
        .saturating_add(script_fee(&params.execution_prices, units))
        .saturating_add(ref_script_fee(&params.min_fee_ref_script_cost_per_byte, ref_script_bytes))
}

/// Minimum lovelace for `output` exactly as it is encoded now
pub fn min_utxo(output: &TransactionOutput, coins_per_utxo_byte: Lovelace) -> Lovelace {
    (UTXO_ENTRY_OVERHEAD + output.encoded_size() as u64).saturating_mul(coins_per_utxo_byte)
}

/// Smallest lovelace amount that satisfies the min-UTxO rule once written
/// into `output`. The coin's own width feeds back into the size, so this
/// iterates to a fixed point.
pub fn min_ada_required(output: &TransactionOutput, coins_per_utxo_byte: Lovelace) -> Lovelace {
    let mut probe = output.clone();
    probe.value.lovelace = 0;
    let mut required = min_utxo(&probe, coins_per_utxo_byte);
    loop {
        probe.value.lovelace = required;
        let next = min_utxo(&probe, coins_per_utxo_byte);
        if next <= required {
            return required;
        }
        required = next;
    }
}

/// `ceil(fee * collateral_percentage / 100)`
pub fn required_collateral(params: &ProtocolParams, fee: Lovelace) -> Lovelace {
    let scaled = fee as u128 * params.collateral_percentage as u128;
    clamp(scaled.div_ceil(100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_common::{Address, Value};
    use test_case::test_case;

    #[test]
    fn linear_fee_uses_a_and_b() {
        let params = ProtocolParams::default();
        assert_eq!(linear_fee(&params, 300), 44 * 300 + 155_381);
    }

    #[test]
    fn script_fee_rounds_up_once() {
        let prices = ExUnitPrices::default();
        // 1000 * 0.0577 + 1_000_000 * 0.0000721 = 57.7 + 72.1 = 129.8
        assert_eq!(script_fee(&prices, ExUnits::new(1_000, 1_000_000)), 130);
        assert_eq!(script_fee(&prices, ExUnits::default()), 0);
    }

    #[test_case(0 => 0; "nothing referenced")]
    #[test_case(1_000 => 15_000; "within first tier")]
    #[test_case(25_600 => 384_000; "exactly one tier")]
    #[test_case(30_000 => 384_000 + 79_200; "into second tier")]
    fn tiered_ref_script_fee(bytes: u64) -> Lovelace {
        ref_script_fee(&RationalNumber::from_integer(15), bytes)
    }

    #[test]
    fn min_ada_is_a_fixed_point() {
        let output = TransactionOutput::new(Address::None, Value::from_lovelace(0));
        let required = min_ada_required(&output, 4_310);
        let mut funded = output.clone();
        funded.value.lovelace = required;
        assert_eq!(min_utxo(&funded, 4_310), required);
    }

    #[test_case(170_000 => 255_000; "rounds exactly")]
    #[test_case(170_001 => 255_002; "rounds up")]
    fn collateral_percentage(fee: Lovelace) -> Lovelace {
        required_collateral(&ProtocolParams::default(), fee)
    }
}
