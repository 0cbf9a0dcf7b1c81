//! Processor with explicit order ids, split recipients and a per-asset
//! maximum order precision.

crate::bindings!(OrderProcessorV3 {
    struct Order {
        address recipient;
        address assetToken;
        address paymentToken;
        bool sell;
        uint8 orderType;
        uint256 assetTokenQuantity;
        uint256 paymentTokenQuantity;
        uint256 price;
        uint8 tif;
        address splitRecipient;
        uint256 splitAmount;
    }

    struct OrderRequest {
        address recipient;
        address assetToken;
        address paymentToken;
        uint256 quantityIn;
        uint256 price;
    }

    event OrderRequested(uint256 indexed id, address indexed recipient, Order order);
    event OrderFill(uint256 indexed id, address indexed paymentToken, address indexed assetToken, address requester, uint256 assetAmount, uint256 paymentAmount, uint256 feesTaken, bool sell);
    event OrderFulfilled(uint256 indexed id, address indexed requester);
    event CancelRequested(uint256 indexed id, address indexed requester);
    event OrderCancelled(uint256 indexed id, address indexed requester, string reason);

    function requestOrder(Order calldata order) external returns (uint256 id);
    function requestCancel(uint256 id) external;
    function getOrderIdFromOrderRequest(OrderRequest memory orderRequest, bytes32 salt) external view returns (uint256);
    function getOrderStatus(uint256 id) external view returns (uint8);
    function getUnfilledAmount(uint256 id) external view returns (uint256);
    function getReceivedAmount(uint256 id) external view returns (uint256);
    function maxOrderDecimals(address token) external view returns (uint8);
    function estimateTotalFeesForOrder(address requester, bool sell, address paymentToken, uint256 paymentTokenOrderValue) external view returns (uint256);

    function selfPermit(address token, address owner, uint256 value, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external;
    function multicall(bytes[] calldata data) external returns (bytes[] memory results);
});
