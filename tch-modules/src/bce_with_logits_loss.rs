use crate::common::*;

#[derive(Debug)]
pub struct BceWithLogitsLossInit {
    pub weight: Option<Tensor>,
    pub pos_weight: Option<Tensor>,
    pub reduction: Reduction,
}

impl BceWithLogitsLossInit {
    pub fn default(reduction: Reduction) -> Self {
        Self {
            weight: None,
            pos_weight: None,
            reduction,
        }
    }

    pub fn build<'a>(self, path: impl Borrow<nn::Path<'a>>) -> BceWithLogitsLoss {
        let Self {
            weight,
            pos_weight,
            reduction,
        } = self;

        let path = path.borrow();
        let register = |name: &str, from: Tensor| {
            tch::no_grad(|| {
                let mut buffer = path.zeros_no_train(name, &from.size());
                buffer.copy_(&from);
                buffer
            })
        };
        let weight = weight.map(|from| register("weight", from));
        let pos_weight = pos_weight.map(|from| register("pos_weight", from));

        BceWithLogitsLoss {
            weight,
            pos_weight,
            reduction,
        }
    }
}

/// Binary cross entropy computed on raw logits for numerical stability.
#[derive(Debug)]
pub struct BceWithLogitsLoss {
    weight: Option<Tensor>,
    pos_weight: Option<Tensor>,
    reduction: Reduction,
}

impl BceWithLogitsLoss {
    pub fn f_forward(&self, input: &Tensor, target: &Tensor) -> Result<Tensor> {
        ensure!(
            input.size() == target.size(),
            "input and target tensors must have equal shape, but get {:?} and {:?}",
            input.size(),
            target.size()
        );
        debug_assert!(
            bool::from(target.ge(0.0).logical_and(&target.le(1.0)).all()),
            "target values must be in range of [0.0, 1.0]"
        );

        // mean over nothing is undefined
        if input.is_empty() && self.reduction == Reduction::Mean {
            let device = input.device();
            return Ok(Tensor::zeros(&[], (Kind::Float, device)).set_requires_grad(false));
        }

        Ok(input.f_binary_cross_entropy_with_logits(
            target,
            self.weight.as_ref(),
            self.pos_weight.as_ref(),
            self.reduction,
        )?)
    }

    pub fn forward(&self, input: &Tensor, target: &Tensor) -> Tensor {
        self.f_forward(input, target).unwrap()
    }
}
