//! Small price statistics shared by the simulator and the renderers.

/// Fallback relative volatility when the window is not filled yet.
pub const DEFAULT_VOLATILITY: f64 = 0.01;

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Compute sample standard deviation.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Coefficient of variation over the trailing `window` prices.
///
/// Returns `DEFAULT_VOLATILITY` with fewer than `window` prices (or a window
/// smaller than 2), and 0.0 when the window mean is zero.
pub fn relative_volatility(prices: &[f64], window: usize) -> f64 {
    if window < 2 || prices.len() < window {
        return DEFAULT_VOLATILITY;
    }
    let subset = &prices[prices.len() - window..];
    let avg = mean(subset);
    if avg.abs() < f64::EPSILON {
        return 0.0;
    }
    std_dev(subset) / avg
}

/// Trailing simple moving average ending at the last price.
pub fn moving_average(prices: &[f64], window: usize) -> Option<f64> {
    if window == 0 || prices.len() < window {
        return None;
    }
    Some(mean(&prices[prices.len() - window..]))
}

/// `(next - prev) / prev`, or `None` for a zero base.
pub fn simple_return(prev: f64, next: f64) -> Option<f64> {
    if prev.abs() < f64::EPSILON {
        return None;
    }
    Some((next - prev) / prev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_dev() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&data) - 5.0).abs() < 1e-9);
        assert!((std_dev(&data) - 2.138089935).abs() < 1e-6);
        assert_eq!(std_dev(&[1.0]), 0.0);
    }

    #[test]
    fn test_relative_volatility_uses_trailing_window() {
        let prices = vec![1000.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        assert_eq!(relative_volatility(&prices, 5), 0.0);

        let short = vec![10.0, 11.0];
        assert_eq!(relative_volatility(&short, 5), DEFAULT_VOLATILITY);
    }

    #[test]
    fn test_moving_average() {
        let prices = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(moving_average(&prices, 2), Some(3.5));
        assert_eq!(moving_average(&prices, 5), None);
    }

    #[test]
    fn test_simple_return() {
        assert_eq!(simple_return(100.0, 110.0), Some(0.1));
        assert_eq!(simple_return(0.0, 5.0), None);
    }
}
