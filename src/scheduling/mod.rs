//! This module takes care of scheduling identification work over batches of
//! electrons, encapsulating use of multiple threads

#[cfg(not(feature = "multi-threading"))] mod sequential;
#[cfg(feature = "multi-threading")] mod multi_threading;

use crate::error::Result;


/// Minimal number of electrons handled by one parallel task
///
/// Identification decisions are cheap, so handing electrons to threads one by
/// one would spend more time in synchronization than in actual work.
///
#[cfg_attr(not(feature = "multi-threading"), allow(dead_code))]
const MIN_BATCH_SIZE: usize = 256;


/// Apply an identification decision to a batch of electrons, in the manner
/// that was configured at build time.
///
/// Results come out in the order of the inputs. If any decision fails, one of
/// the errors is returned and the other results are discarded.
///
pub fn evaluate_batch<T, R>(
    items: &[T],
    decide: impl Send + Sync + Fn(&T) -> Result<R>
) -> Result<Vec<R>>
    where T: Sync,
          R: Send
{
    // ...in sequential mode
    #[cfg(not(feature = "multi-threading"))]
    { sequential::evaluate_batch_impl(items, decide) }

    // ...in multi-threaded mode
    #[cfg(feature = "multi-threading")]
    { multi_threading::evaluate_batch_impl(items, decide) }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn results_keep_input_order() {
        let inputs = (0..1000).collect::<Vec<u32>>();
        let outputs = evaluate_batch(&inputs, |&x| Ok(2 * x)).unwrap();
        assert_eq!(outputs.len(), inputs.len());
        assert!(outputs.iter().zip(&inputs).all(|(&out, &x)| out == 2 * x));
    }

    #[test]
    fn errors_are_propagated() {
        let inputs = (0..1000).collect::<Vec<u32>>();
        let result = evaluate_batch(&inputs, |&x| {
            if x == 666 {
                Err(Error::InvalidConfiguration(format!("bad input {x}")))
            } else {
                Ok(x)
            }
        });
        assert!(matches!(result, Err(Error::InvalidConfiguration(ref msg)) if msg == "bad input 666"));
    }

    #[test]
    fn empty_batch() {
        let inputs: [u32; 0] = [];
        assert!(evaluate_batch(&inputs, |&x| Ok(x)).unwrap().is_empty());
    }
}
